//! # rag-cli
//!
//! Command-line front end for the resource-allocation graph deadlock detector.
//!
//! This is the main entry point for the `rag` binary. It resolves the layered
//! configuration, sets up logging and error reporting, opens the graph store
//! and dispatches to the command handlers.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use rag_config::{ConfigLayering, ConfigLoader, ConfigSource, LogFormat, RagConfig};
use std::collections::HashMap;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::graph::GraphFormat;
use commands::CommandContext;
use output::errors::ErrorFormatter;
use output::OutputHandler;

/// Detect deadlocks in a resource-allocation graph
#[derive(Parser)]
#[command(name = "rag", version, about = "Resource-allocation graph deadlock detector")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this rag.toml instead of searching for one
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Graph file to read and update
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<Utf8PathBuf>,

    /// Keep the graph in memory for this run only
    #[arg(long, global = true, conflicts_with = "store")]
    pub memory: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a process
    AddProcess { id: String },
    /// Register a resource
    AddResource { id: String },
    /// Record that a process waits for a resource
    Request { process: String, resource: String },
    /// Record that a resource is held by a process
    Allocate { process: String, resource: String },
    /// Check the graph for deadlock
    Detect {
        /// Stop after this many cycles
        #[arg(long, value_name = "N")]
        max_cycles: Option<usize>,
        /// Give up enumerating after this many milliseconds
        #[arg(long, value_name = "MS")]
        deadline_ms: Option<u64>,
        /// Exit with status 2 when a deadlock exists
        #[arg(long)]
        fail_on_deadlock: bool,
    },
    /// Print the graph
    Graph {
        #[arg(long, value_enum, default_value = "text")]
        format: GraphFormat,
    },
    /// Remove every process, resource and edge
    Reset,
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_panic_handler();

    if let Commands::Version = cli.command {
        commands::show_version(&OutputHandler::new(cli.json));
        return ExitCode::SUCCESS;
    }

    let output = OutputHandler::new(cli.json);
    let formatter = ErrorFormatter::new(output.colors());

    let ctx = match open_context(&cli, output) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("{}", formatter.format(&err, None));
            return ExitCode::FAILURE;
        },
    };

    match commands::dispatch_command(cli.command, &ctx) {
        Ok(status) => status.exit_code(),
        Err(err) => {
            let hint = commands::did_you_mean(&err, &ctx);
            eprintln!("{}", formatter.format(&err, hint.as_deref()));
            ExitCode::FAILURE
        },
    }
}

fn open_context(cli: &Cli, output: OutputHandler) -> anyhow::Result<CommandContext> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let cwd = Utf8PathBuf::try_from(cwd).context("Current directory is not valid UTF-8")?;

    let config = ConfigLoader::new(cwd).load(
        cli.config.as_deref(),
        ConfigLayering::collect_env_overrides(),
        cli_overrides(cli),
    )?;

    setup_logging(&config, cli.verbose);
    info!("Starting rag v{}", env!("CARGO_PKG_VERSION"));
    for source in &config.sources {
        debug!("{}", describe_source(source));
    }

    Ok(CommandContext::open(config, output)?)
}

/// One line per configuration layer, logged once logging is up
fn describe_source(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Global(path) => format!("Loaded global config from {}", path),
        ConfigSource::Project(path) => format!("Loaded project config from {}", path),
        ConfigSource::Environment(key) => format!("Applied environment override {}", key),
        ConfigSource::CommandLine => "Applied command-line overrides".to_string(),
    }
}

/// Flags that take part in configuration layering
fn cli_overrides(cli: &Cli) -> HashMap<String, String> {
    let mut overrides = HashMap::new();

    if let Some(store) = &cli.store {
        overrides.insert("store-path".to_string(), store.to_string());
        overrides.insert("store-backend".to_string(), "json".to_string());
    }
    if cli.memory {
        overrides.insert("store-backend".to_string(), "memory".to_string());
    }
    if let Commands::Detect { max_cycles, deadline_ms, .. } = &cli.command {
        if let Some(max_cycles) = max_cycles {
            overrides.insert("max-cycles".to_string(), max_cycles.to_string());
        }
        if let Some(deadline_ms) = deadline_ms {
            overrides.insert("deadline-ms".to_string(), deadline_ms.to_string());
        }
    }

    overrides
}

fn setup_logging(config: &RagConfig, verbose: bool) {
    let filter = if verbose {
        crate_filter("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| crate_filter(&config.log_level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second initialisation only happens in tests; keep the first subscriber
    let _ = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

fn crate_filter(level: &str) -> EnvFilter {
    let directives = ["rag_cli", "rag_core", "rag_graph", "rag_store"]
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("rag encountered an unexpected error: {}", panic_info);
        eprintln!("rag crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/rag-lang/rag/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
