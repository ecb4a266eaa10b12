//! `rag reset` command implementation.

use anyhow::Result;

use super::{CommandContext, Status};

/// Execute the `rag reset` command
pub fn execute(ctx: &CommandContext) -> Result<Status> {
    ctx.detector.reset()?;
    ctx.report("Graph states cleared")?;
    Ok(Status::Success)
}
