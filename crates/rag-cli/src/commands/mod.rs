//! Command implementations and dispatch logic.
//!
//! Each command is a plain function taking the shared `CommandContext`.

use anyhow::Result;
use rag_config::{RagConfig, StoreBackend};
use rag_core::error::{RagError, RagResult};
use rag_graph::{DeadlockDetector, EnumerationLimits};
use rag_store::{JsonFileRepository, MemoryRepository};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod detect;
pub mod edges;
pub mod graph;
pub mod nodes;
pub mod reset;

#[cfg(test)]
mod tests;

use crate::{output::OutputHandler, Commands};

/// Largest edit distance still offered as a "did you mean"
const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Shared context for all commands
pub struct CommandContext {
    pub config: RagConfig,
    pub detector: DeadlockDetector,
    pub output: OutputHandler,
}

/// How a successful command should exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// `detect --fail-on-deadlock` found a deadlock
    Deadlock,
}

impl Status {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Status::Success => ExitCode::SUCCESS,
            Status::Deadlock => ExitCode::from(2),
        }
    }
}

/// Result line for mutating commands in `--json` mode
#[derive(Debug, Serialize)]
struct Message<'a> {
    status: &'static str,
    message: &'a str,
}

impl CommandContext {
    /// Open the configured store and rebuild the detector from it
    pub fn open(config: RagConfig, output: OutputHandler) -> RagResult<Self> {
        let detector = match config.store_backend {
            StoreBackend::Json => {
                let repository = JsonFileRepository::open(&config.store_path)?;
                info!("Using json store at {}", repository.path());
                DeadlockDetector::open(Arc::new(repository))?
            },
            StoreBackend::Memory => {
                info!("Using memory store");
                DeadlockDetector::open(Arc::new(MemoryRepository::new()))?
            },
        };

        Ok(Self::with_detector(config, detector, output))
    }

    /// Context around an existing detector; the config only supplies limits
    pub fn with_detector(config: RagConfig, detector: DeadlockDetector, output: OutputHandler) -> Self {
        let detector = detector.with_limits(limits_from_config(&config));
        Self {
            config,
            detector,
            output,
        }
    }

    /// Report a completed mutation
    fn report(&self, message: &str) -> Result<()> {
        if self.output.is_json() {
            self.output.json(&Message {
                status: "success",
                message,
            })?;
        } else {
            self.output.success(message);
        }
        Ok(())
    }
}

/// Enumeration limits described by the configuration
pub fn limits_from_config(config: &RagConfig) -> EnumerationLimits {
    let limits = EnumerationLimits::default().with_max_cycles(config.max_cycles);
    match config.deadline_ms {
        Some(ms) => limits.with_deadline(Duration::from_millis(ms)),
        None => limits,
    }
}

/// Dispatch a command to its handler
pub fn dispatch_command(command: Commands, ctx: &CommandContext) -> Result<Status> {
    match command {
        Commands::AddProcess { id } => nodes::add_process(&id, ctx),
        Commands::AddResource { id } => nodes::add_resource(&id, ctx),
        Commands::Request { process, resource } => edges::request(&process, &resource, ctx),
        Commands::Allocate { process, resource } => edges::allocate(&process, &resource, ctx),
        Commands::Detect {
            fail_on_deadlock, ..
        } => detect::execute(fail_on_deadlock, ctx),
        Commands::Graph { format } => graph::execute(format, ctx),
        Commands::Reset => reset::execute(ctx),
        Commands::Version => {
            show_version(&ctx.output);
            Ok(Status::Success)
        },
    }
}

pub fn show_version(output: &OutputHandler) {
    let version = env!("CARGO_PKG_VERSION");
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    output.line(&format!("rag v{}", version));
    output.info(&format!("Built: {}", env!("RAG_BUILD_DATE")));
    output.info(&format!("Target: {}", target));
    output.info(&format!("Rust: {}", env!("RAG_RUSTC_VERSION")));
}

/// Closest existing id for an unknown-node failure
pub fn did_you_mean(err: &anyhow::Error, ctx: &CommandContext) -> Option<String> {
    match err.downcast_ref::<RagError>() {
        Some(RagError::UnknownNode { id }) => {
            let view = ctx.detector.graph_view();
            suggest_similar_id(id, view.nodes.iter().map(|node| node.id.as_str()))
                .map(|similar| format!("did you mean '{}'?", similar))
        },
        _ => None,
    }
}

/// Suggest a similar id based on edit distance
pub fn suggest_similar_id<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let distance = edit_distance(&input.to_lowercase(), &candidate.to_lowercase());
        if distance < best_distance && distance <= MAX_SUGGESTION_DISTANCE {
            best_distance = distance;
            best_match = Some(candidate);
        }
    }

    best_match.map(str::to_string)
}

/// Levenshtein distance over chars, two rows at a time
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != *b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}
