//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let sources = orchestrator.sources();

    if sources.is_empty() {
        Output::info("No transcripts found. Add transcript JSON files to the corpus directory.");
        return Ok(());
    }

    Output::header(&format!("Course Videos ({})", sources.len()));
    println!();

    for summary in &sources {
        Output::source_info(summary);
    }

    let indexed = orchestrator.vector_store().count().await?;
    println!();
    Output::kv("Total videos", &sources.len().to_string());
    Output::kv("Total segments", &orchestrator.corpus().len().to_string());
    Output::kv("Embedded segments", &indexed.to_string());

    Ok(())
}
