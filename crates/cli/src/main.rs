//! RagWeave CLI, the main entry point.
//!
//! Commands:
//! - `workflow validate <file>`        check a workflow graph for structural problems
//! - `workflow run <file> --query <q>` dry-run a workflow offline, events as JSON lines
//! - `config show`                     print the effective configuration
//! - `config path`                     print the configuration file path

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod offline;

#[derive(Parser)]
#[command(
    name = "ragweave",
    about = "RagWeave: agent workflows over retrieved context and tools",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate or dry-run workflow graphs
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// Parse a workflow JSON file and report structural problems
    Validate {
        file: PathBuf,
    },

    /// Run a workflow with an offline echo model and no tools
    Run {
        file: PathBuf,

        /// The user query the run starts from
        #[arg(short, long)]
        query: String,

        /// Lower workflow.max_execution_steps (at most 50)
        #[arg(long)]
        max_steps: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Workflow { action } => match action {
            WorkflowAction::Validate { file } => commands::workflow::validate(&file).await?,
            WorkflowAction::Run {
                file,
                query,
                max_steps,
            } => commands::workflow::run(&file, &query, max_steps).await?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}
