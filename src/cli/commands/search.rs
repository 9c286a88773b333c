//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, top_n: Option<usize>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(n) = top_n {
        settings.retrieval.top_n = n;
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let result = orchestrator.retriever().retrieve(query).await;
    spinner.finish_and_clear();

    match result {
        Ok(retrieval) if retrieval.is_empty() => {
            Output::warning("No relevant content found for your query.");
        }
        Ok(retrieval) => {
            Output::success(&format!("Found {} passages", retrieval.citations.len()));
            for citation in &retrieval.citations {
                Output::citation(citation);
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            if e.is_unavailable() {
                Output::info("Check that the embedding service is running.");
            }
            return Err(e.into());
        }
    }

    Ok(())
}
