//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the storage seam for the retriever:
//! it holds `(vector, chunk)` entries under opaque ids and answers
//! k-nearest-neighbour queries by cosine similarity.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`insert`](VectorIndex::insert) | Store one entry, checking dimensionality |
//! | [`search`](VectorIndex::search) | Top-`k` entries by descending similarity |
//! | [`entries`](VectorIndex::entries) | Entries in insertion order (for persistence) |
//!
//! The in-memory implementation lives in [`memory`]; the app crate
//! persists its entries to SQLite and rebuilds it on load.

pub mod memory;

use crate::error::Result;
use crate::models::Chunk;

pub use memory::InMemoryIndex;

/// A stored `(embedding, chunk)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub chunk: Chunk,
    /// Cosine similarity with the query vector.
    pub score: f32,
}

/// Storage and k-NN lookup for chunk embeddings.
pub trait VectorIndex: Send + Sync {
    /// Dimensionality every stored vector must have.
    fn dims(&self) -> usize;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store an entry. Fails with
    /// [`ChatError::DimensionMismatch`](crate::ChatError::DimensionMismatch)
    /// when `vector.len() != self.dims()`.
    fn insert(&mut self, id: String, vector: Vec<f32>, chunk: Chunk) -> Result<()>;

    /// Up to `k` entries sorted by descending similarity; ties keep
    /// insertion order. `k <= 0` fails with
    /// [`ChatError::InvalidArgument`](crate::ChatError::InvalidArgument).
    fn search(&self, query: &[f32], k: i64) -> Result<Vec<ScoredChunk>>;

    /// All entries in insertion order.
    fn entries(&self) -> &[IndexEntry];
}
