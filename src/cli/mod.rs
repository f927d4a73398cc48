//! CLI command definitions and parsing
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "stakefuse",
    version,
    author = "neur0map",
    about = "Stakeholder-aware multi-query retrieval with Reciprocal Rank Fusion",
    long_about = "stakefuse sizes, expands and fuses retrieval queries for a stakeholder profile. \
                  These commands expose each stage for inspection and run end-to-end searches \
                  over a local JSONL passage file."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/stakefuse/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Stakeholder profile given on the command line
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Stakeholder id (e.g. "cto", "qa_manager")
    #[arg(long)]
    pub id: String,

    /// Free-text role; may list alternatives ("CTO/최고기술책임자")
    #[arg(long, default_value = "")]
    pub role: String,

    /// Concern, most important first (repeatable)
    #[arg(short = 'c', long = "concern")]
    pub concerns: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the result-count sizing for a profile
    K {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Number of documents in the collection
        #[arg(short = 'n', long)]
        corpus: usize,

        /// Backend without efficient top-K pruning
        #[arg(long)]
        memory_constrained: bool,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the expanded, weighted queries for a profile
    Expand {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Maximum number of queries (before the cross-language tail)
        #[arg(long)]
        max_queries: Option<usize>,

        /// Disable the cross-language tail query
        #[arg(long)]
        no_alternate: bool,

        /// Disable synonym queries
        #[arg(long)]
        no_synonyms: bool,

        /// Disable role-specific queries
        #[arg(long)]
        no_role_terms: bool,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Encode text into a sparse keyword vector
    Encode {
        /// Text to encode
        text: String,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Search a JSONL passage file for a profile
    Search {
        #[command(flatten)]
        profile: ProfileArgs,

        /// JSONL file, one {"id"?, "text", "metadata"?} object per line
        #[arg(short, long, value_name = "FILE")]
        passages: PathBuf,

        /// Collection name
        #[arg(long, default_value = "default")]
        collection: String,

        /// Backend without efficient top-K pruning
        #[arg(long)]
        memory_constrained: bool,

        /// Characters of passage text shown per result
        #[arg(long, default_value = "120")]
        preview: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
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

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
