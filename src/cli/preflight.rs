//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{KildeError, Result};
use crate::openai::is_api_key_configured;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing needs the corpus and the embedding provider.
    Index,
    /// Searching needs the corpus and the embedding provider for queries.
    Search,
    /// Asking additionally needs the generation provider.
    Ask,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_corpus_dir(settings)?;

    let needs_openai = match operation {
        Operation::Index | Operation::Search => uses_openai(&settings.embedding.provider),
        Operation::Ask => {
            uses_openai(&settings.embedding.provider)
                || uses_openai(&settings.generation.provider)
        }
    };

    if needs_openai {
        check_api_key()?;
    }
    Ok(())
}

fn uses_openai(provider: &str) -> bool {
    provider.eq_ignore_ascii_case("openai")
}

fn check_corpus_dir(settings: &Settings) -> Result<()> {
    let dir = settings.corpus_dir();
    if dir.is_dir() {
        Ok(())
    } else {
        Err(KildeError::Config(format!(
            "Corpus directory {} does not exist. Set [corpus] dir in the config file.",
            dir.display()
        )))
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(KildeError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}
