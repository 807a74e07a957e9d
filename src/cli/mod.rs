//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "doclens",
    version,
    about = "Document retrieval and analysis pipeline",
    long_about = "Doclens ingests documents into an embedded vector store and answers questions \
                  about them: queries are classified by intent, grounded in retrieved chunks, and \
                  dispatched to a specialist analyzer (clause extraction, risk assessment, \
                  summarization, or general Q&A)."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/doclens/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a document into the vector store
    Ingest {
        /// Path to the document (PDF, TXT, or Markdown)
        doc: PathBuf,
    },

    /// Ask one question about the ingested documents
    Query {
        /// Question text
        question: String,

        /// Ingest this document before querying
        #[arg(short, long)]
        doc: Option<PathBuf>,

        /// Number of context chunks to retrieve (defaults to config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive query loop
    Ask,

    /// Clear the vector store
    Clear,

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

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
