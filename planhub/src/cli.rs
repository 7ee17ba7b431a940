//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Planhub - planning signal aggregator and agent runtime
#[derive(Parser)]
#[command(
    name = "planhub",
    about = "Aggregates upstream planning signals and runs multi-phase agents",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one signal aggregation and print the result
    Signals {
        /// Subject to aggregate for
        #[arg(long)]
        subject_id: String,

        /// Topic to aggregate for
        #[arg(long)]
        topic: String,

        /// Optional week window
        #[arg(long)]
        week: Option<u32>,

        /// Optional day window
        #[arg(long)]
        day: Option<u32>,

        /// Bypass cached signals entirely
        #[arg(long)]
        force_refresh: bool,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Compile a prompt template into the artifact store
    Compile {
        /// Template id (e.g. clo_v3)
        #[arg(long)]
        template_id: String,

        /// Subject the artifact belongs to
        #[arg(long)]
        subject_id: String,

        /// Template variables as KEY=VALUE pairs
        #[arg(value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },
}

/// Output format for read commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
