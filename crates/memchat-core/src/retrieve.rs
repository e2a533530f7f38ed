//! Retrieval pipeline: chunk → embed → index at ingest time, embed →
//! search → format at query time.
//!
//! # Ingest
//!
//! Each [`Document`] is chunked, every chunk is embedded, all vectors are
//! checked against the index dimensionality, and only then are the
//! entries inserted. A failure anywhere in that sequence skips the whole
//! document (nothing from it is inserted) and ingestion continues with
//! the next one.
//!
//! [`ChatError::EmbeddingUnavailable`] is different: the embedder is down,
//! so every remaining document is skipped with the same reason without
//! calling it again, and the report is marked
//! [`IngestReport::embedding_unavailable`].
//!
//! # Query
//!
//! [`Retriever::retrieve`] embeds the query, takes the top `k` hits and
//! renders them as a context block:
//!
//! ```text
//!
//! From a.pdf:
//! <chunk text>
//!
//! From b.pdf:
//! <chunk text>
//! ```
//!
//! together with the unique source ids in first-seen order.

use std::sync::Arc;

use uuid::Uuid;

use crate::chunk::Chunker;
use crate::embedding::Embedder;
use crate::error::{ChatError, Result};
use crate::index::VectorIndex;
use crate::models::{Chunk, Document, RetrievalResult};

/// Default number of chunks pulled into the context block.
pub const DEFAULT_K: i64 = 9;

/// Outcome of an ingest run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Documents fully ingested.
    pub documents: usize,
    /// Chunks inserted into the index.
    pub chunks: usize,
    /// `(source_id, reason)` for each skipped document.
    pub skipped: Vec<(String, String)>,
    /// The embedder became unreachable during the run, so the index is
    /// missing documents that would otherwise have been ingested.
    pub embedding_unavailable: bool,
}

impl IngestReport {
    /// Whether every skip was caused by the documents themselves.
    pub fn is_complete(&self) -> bool {
        !self.embedding_unavailable
    }
}

/// Progress notification emitted after each document.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestProgress<'a> {
    pub source_id: &'a str,
    pub n: usize,
    pub total: usize,
}

pub struct Retriever {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    index: Box<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, index: Box<dyn VectorIndex>) -> Self {
        Self {
            chunker,
            embedder,
            index,
        }
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub async fn ingest(&mut self, docs: &[Document]) -> IngestReport {
        self.ingest_with_progress(docs, &|_| {}).await
    }

    /// Ingest `docs`, calling `progress` after each document.
    pub async fn ingest_with_progress(
        &mut self,
        docs: &[Document],
        progress: &(dyn Fn(IngestProgress<'_>) + Sync),
    ) -> IngestReport {
        let mut report = IngestReport::default();

        let mut outage: Option<String> = None;

        for (i, doc) in docs.iter().enumerate() {
            if let Some(reason) = &outage {
                report.skipped.push((doc.source_id.clone(), reason.clone()));
            } else {
                match self.ingest_document(doc).await {
                    Ok(n) => {
                        report.documents += 1;
                        report.chunks += n;
                        tracing::debug!(source = %doc.source_id, chunks = n, "ingested document");
                    }
                    Err(e @ ChatError::EmbeddingUnavailable(_)) => {
                        tracing::warn!(
                            source = %doc.source_id,
                            error = %e,
                            remaining = docs.len() - i - 1,
                            "embedder unavailable; skipping remaining documents"
                        );
                        report.embedding_unavailable = true;
                        report.skipped.push((doc.source_id.clone(), e.to_string()));
                        outage = Some(e.to_string());
                    }
                    Err(e) => {
                        tracing::warn!(source = %doc.source_id, error = %e, "skipping document");
                        report.skipped.push((doc.source_id.clone(), e.to_string()));
                    }
                }
            }
            progress(IngestProgress {
                source_id: &doc.source_id,
                n: i + 1,
                total: docs.len(),
            });
        }

        report
    }

    async fn ingest_document(&mut self, doc: &Document) -> Result<usize> {
        let mut prepared: Vec<(Vec<f32>, Chunk)> = Vec::new();
        for chunk in self.chunker.chunks(doc) {
            let vector = self.embedder.embed(&chunk.text).await?;
            if vector.len() != self.index.dims() {
                return Err(ChatError::DimensionMismatch {
                    expected: self.index.dims(),
                    actual: vector.len(),
                });
            }
            prepared.push((vector, chunk));
        }

        let count = prepared.len();
        for (vector, chunk) in prepared {
            self.index
                .insert(Uuid::new_v4().to_string(), vector, chunk)?;
        }
        Ok(count)
    }

    /// Top-`k` context block and sources for `query`.
    ///
    /// An empty index yields an empty result without calling the embedder.
    pub async fn retrieve(&self, query: &str, k: i64) -> Result<RetrievalResult> {
        if k <= 0 {
            return Err(ChatError::InvalidArgument(format!(
                "k must be positive, got {}",
                k
            )));
        }
        if self.index.is_empty() {
            return Ok(RetrievalResult::default());
        }

        let query_vec = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_vec, k)?;

        let mut result = RetrievalResult::default();
        for hit in hits {
            let source = &hit.chunk.source_id;
            if !result.sources.iter().any(|s| s == source) {
                result.sources.push(source.clone());
            }
            result
                .context
                .push_str(&format!("\nFrom {}:\n{}\n", source, hit.chunk.text));
        }
        Ok(result)
    }
}
