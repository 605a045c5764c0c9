//! CLI module for Quorum
//!
//! Provides command-line interface parsing for the quorum-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quorum - multi-provider inference orchestration
///
/// Splits a request into capability tasks, dispatches them to several
/// unreliable providers and returns one synthesized, confidence-scored answer.
#[derive(Parser, Debug)]
#[command(
    name = "quorum-server",
    version,
    about = "Quorum - multi-provider inference orchestration",
    long_about = "Splits a request into capability tasks, dispatches them to several unreliable\n\
                  inference providers and returns one synthesized, confidence-scored answer.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a config.",
    after_help = "EXAMPLES:\n    \
                  quorum-server init --minimal                      # Scaffold a keyless demo config\n    \
                  quorum-server                                     # Start the server (requires quorum.toml)\n    \
                  quorum-server ask \"Why?\" -c reasoning -c sentiment  # One-shot orchestration\n    \
                  quorum-server providers                           # List configured providers\n    \
                  quorum-server providers --check                   # Test provider connectivity\n    \
                  quorum-server --config my.toml config --validate  # Check a config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "quorum.toml", env = "QUORUM_CONFIG", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (the default)
    Serve,

    /// Orchestrate a single query and print the answer
    Ask {
        /// The question to answer
        query: String,

        /// Capability to request; repeat for several (defaults to all declared)
        #[arg(short = 'c', long = "capability")]
        capabilities: Vec<String>,

        /// Orchestration mode: fallback or fanout
        #[arg(short, long)]
        mode: Option<String>,

        /// Overall deadline in milliseconds
        #[arg(short, long)]
        deadline_ms: Option<i64>,

        /// Extra context appended to every task prompt
        #[arg(long)]
        context: Option<String>,

        /// Print the response as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// List configured providers and whether their credentials resolve
    Providers {
        /// Also send a minimal request to every provider and report the outcome
        #[arg(long)]
        check: bool,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file and report warnings
        #[arg(long)]
        validate: bool,
    },

    /// Create a quorum.toml in the given directory
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// Only scripted local providers, no API keys needed
        #[arg(short, long)]
        minimal: bool,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
