//! `memchat search`: query the GTM index from the command line.

use anyhow::{bail, Result};
use memchat_core::embedding::Embedder;
use std::sync::Arc;

use crate::config::Config;
use crate::ingest::{self, IndexOrigin};
use crate::progress::ProgressReporter;

pub async fn run_search(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    query: &str,
    k: Option<i64>,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let k = k.unwrap_or(config.retrieval.k);
    if k < 1 {
        bail!("--k must be >= 1");
    }

    let gtm = ingest::open_gtm_index(config, embedder, false, reporter).await?;
    if let IndexOrigin::Built(report) = &gtm.origin {
        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            "built index for search"
        );
    }

    let result = gtm.retriever.retrieve(query, k).await?;
    if result.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("{}", result.context.trim_start_matches('\n'));
    println!("Sources: {}", result.sources_list());
    Ok(())
}
