//! GTM index orchestration.
//!
//! Scans the articles directory, then either reuses the persisted index
//! (when its fingerprint still matches the files and settings) or loads,
//! chunks and embeds every document and persists the result.
//!
//! Persistence is best-effort: if the store cannot be opened, read or
//! written, the session continues with the freshly built in-memory index.
//! A build cut short by an embedder outage is never persisted, so the
//! next start retries the skipped documents.

use anyhow::Result;
use memchat_core::embedding::Embedder;
use memchat_core::index::{InMemoryIndex, VectorIndex};
use memchat_core::retrieve::{IngestReport, Retriever};
use std::sync::Arc;

use crate::config::Config;
use crate::documents;
use crate::index_store::IndexStore;
use crate::progress::{IngestEvent, ProgressReporter};

/// Where the retriever's index came from.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOrigin {
    /// Reused from the persisted store.
    Loaded { entries: usize },
    /// Rebuilt from the articles directory.
    Built(IngestReport),
}

pub struct GtmIndex {
    pub retriever: Retriever,
    pub origin: IndexOrigin,
    /// The index on disk matches `retriever`.
    pub saved: bool,
}

async fn open_store(config: &Config) -> Option<IndexStore> {
    if !config.retrieval.persist {
        return None;
    }
    let path = config.memory.index_path();
    match IndexStore::open(&path).await {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot open index store");
            eprintln!(
                "Warning: cannot open GTM index at {} ({:#}); continuing without persistence.",
                path.display(),
                e
            );
            None
        }
    }
}

/// Open the GTM retriever, rebuilding the index when `rebuild` is set or
/// the persisted copy is missing, stale or unreadable.
pub async fn open_gtm_index(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    rebuild: bool,
    reporter: &dyn ProgressReporter,
) -> Result<GtmIndex> {
    let chunker = config.chunker()?;
    let files = documents::scan_articles(
        &config.memory.articles_dir(),
        &config.retrieval.include_globs,
    )?;
    let settings = format!(
        "model={};dims={};window={};overlap={}",
        embedder.model_name(),
        embedder.dims(),
        chunker.window(),
        chunker.overlap()
    );
    let fingerprint = documents::fingerprint(&files, &settings);

    let store = open_store(config).await;

    if let (Some(store), false) = (&store, rebuild) {
        match store.load().await {
            Ok(Some(stored)) => {
                if stored.fingerprint == fingerprint && stored.index.dims() == embedder.dims() {
                    let entries = stored.index.len();
                    tracing::info!(entries, "reusing persisted index");
                    let retriever = Retriever::new(chunker, embedder, Box::new(stored.index));
                    return Ok(GtmIndex {
                        retriever,
                        origin: IndexOrigin::Loaded { entries },
                        saved: true,
                    });
                }
                tracing::info!("persisted index is stale; rebuilding");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "persisted index unreadable; rebuilding");
            }
        }
    }

    reporter.report(IngestEvent::Loading {
        files: files.len() as u64,
    });
    let (docs, unreadable) = documents::load_documents(&files);

    let dims = embedder.dims();
    let mut retriever = Retriever::new(chunker, embedder, Box::new(InMemoryIndex::new(dims)));
    let mut report = retriever
        .ingest_with_progress(&docs, &|p| reporter.report(p.into()))
        .await;
    report.skipped.splice(0..0, unreadable);

    let mut saved = false;
    if let Some(store) = store {
        if !report.is_complete() {
            tracing::warn!("embedder unavailable during build; index not persisted");
        } else {
            match store
                .save(
                    retriever.index(),
                    retriever.embedder().model_name(),
                    &fingerprint,
                )
                .await
            {
                Ok(()) => saved = true,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to persist index");
                    eprintln!(
                        "Warning: could not save GTM index ({:#}); continuing with the in-memory index.",
                        e
                    );
                }
            }
        }
        store.close().await;
    }

    Ok(GtmIndex {
        retriever,
        origin: IndexOrigin::Built(report),
        saved,
    })
}

/// `memchat ingest`: rebuild and persist the GTM index, printing counts.
pub async fn run_ingest(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let gtm = open_gtm_index(config, embedder, true, reporter).await?;

    println!("ingest gtm");
    if let IndexOrigin::Built(report) = &gtm.origin {
        println!("  documents indexed: {}", report.documents);
        println!("  chunks written: {}", report.chunks);
        println!("  documents skipped: {}", report.skipped.len());
        for (source, reason) in &report.skipped {
            println!("    - {}: {}", source, reason);
        }
    }
    if config.retrieval.persist {
        if gtm.saved {
            println!("  index: {}", config.memory.index_path().display());
        } else {
            println!("  index: not saved");
        }
    }
    println!("ok");
    Ok(())
}
