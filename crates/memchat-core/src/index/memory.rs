//! In-memory [`VectorIndex`].
//!
//! Entries live in a `Vec` in insertion order. Search is brute-force
//! cosine similarity followed by a stable sort, so equal scores keep
//! insertion order.

use crate::embedding::cosine_similarity;
use crate::error::{ChatError, Result};
use crate::models::Chunk;

use super::{IndexEntry, ScoredChunk, VectorIndex};

pub struct InMemoryIndex {
    dims: usize,
    entries: Vec<IndexEntry>,
}

impl InMemoryIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: Vec::new(),
        }
    }

    fn check_dims(&self, actual: usize) -> Result<()> {
        if actual != self.dims {
            return Err(ChatError::DimensionMismatch {
                expected: self.dims,
                actual,
            });
        }
        Ok(())
    }
}

impl VectorIndex for InMemoryIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn insert(&mut self, id: String, vector: Vec<f32>, chunk: Chunk) -> Result<()> {
        self.check_dims(vector.len())?;
        self.entries.push(IndexEntry { id, vector, chunk });
        Ok(())
    }

    fn search(&self, query: &[f32], k: i64) -> Result<Vec<ScoredChunk>> {
        if k <= 0 {
            return Err(ChatError::InvalidArgument(format!(
                "k must be positive, got {}",
                k
            )));
        }
        self.check_dims(query.len())?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.vector)))
            .collect();
        // Stable and total: equal scores keep insertion order, NaN ranks last.
        let rank = |score: f32| if score.is_nan() { f32::NEG_INFINITY } else { score };
        scored.sort_by(|a, b| rank(b.1).total_cmp(&rank(a.1)));
        scored.truncate(k as usize);

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let entry = &self.entries[i];
                ScoredChunk {
                    id: entry.id.clone(),
                    chunk: entry.chunk.clone(),
                    score,
                }
            })
            .collect())
    }

    fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}
