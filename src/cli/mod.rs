//! CLI module for Kilde.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Kilde - Hybrid search over a transcribed video course
///
/// Answers questions with timestamped citations into the course videos.
/// The name "Kilde" is Norwegian for "source."
#[derive(Parser, Debug)]
#[command(name = "kilde")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "KILDE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed transcript segments into the vector store
    Index {
        /// Clear the vector store and re-embed everything
        #[arg(short, long)]
        force: bool,
    },

    /// Retrieve timestamped passages for a query
    Search {
        /// Search query
        query: String,

        /// Number of fused segments to keep
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Ask a question and get an answer with citations
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List the videos in the corpus
    List,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_with_top_n() {
        let cli = Cli::try_parse_from(["kilde", "-vv", "search", "primary key", "-n", "3"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Search { query, top_n } => {
                assert_eq!(query, "primary key");
                assert_eq!(top_n, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
