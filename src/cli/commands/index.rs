//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(force: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let corpus = orchestrator.corpus();
    Output::info(&format!(
        "Loaded {} segments from {} videos",
        corpus.len(),
        orchestrator.sources().len()
    ));

    let progress = Output::progress_bar(0, "Embedding segments");
    let result = orchestrator.index_embeddings(force, &progress).await;
    progress.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            Output::error(&format!("Indexing failed: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&format!(
        "Embedded {} segments ({} already indexed, {} total)",
        result.embedded, result.skipped, result.total
    ));

    if !result.orphaned.is_empty() {
        Output::warning(&format!(
            "{} stored embeddings no longer match a transcript segment. Run 'kilde index --force' to rebuild.",
            result.orphaned.len()
        ));
        for id in result.orphaned.iter().take(10) {
            Output::kv("Orphaned", id);
        }
    }

    Ok(())
}
