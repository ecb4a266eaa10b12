//! `rag graph` command implementation.

use anyhow::Result;
use clap::ValueEnum;

use super::{CommandContext, Status};

/// Output format for `rag graph`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Node and edge listing
    Text,
    /// `{ "nodes": [...], "edges": [...] }`
    Json,
    /// Graphviz source
    Dot,
}

/// Execute the `rag graph` command
pub fn execute(format: GraphFormat, ctx: &CommandContext) -> Result<Status> {
    // --json wins over the default text listing
    let format = match format {
        GraphFormat::Text if ctx.output.is_json() => GraphFormat::Json,
        other => other,
    };

    match format {
        GraphFormat::Json => ctx.output.json(&ctx.detector.graph_view())?,
        GraphFormat::Dot => ctx.output.line(ctx.detector.snapshot().to_dot().trim_end()),
        GraphFormat::Text => print_text(ctx),
    }

    Ok(Status::Success)
}

fn print_text(ctx: &CommandContext) {
    let view = ctx.detector.graph_view();
    if view.is_empty() {
        ctx.output.info("Graph is empty.");
        return;
    }

    let colors = ctx.output.colors();
    ctx.output.line(&colors.bold(&format!("Nodes ({})", view.nodes.len())));
    for node in &view.nodes {
        ctx.output.line(&format!("  {}  {}", node.id, node.kind));
    }

    ctx.output.line(&colors.bold(&format!("Edges ({})", view.edges.len())));
    for (edge, relation) in view.relations() {
        ctx.output.line(&format!("  {}  {}", edge, relation));
    }
}
