//! `rag add-process` and `rag add-resource`.

use anyhow::Result;
use rag_core::types::NodeKind;

use super::{CommandContext, Status};

pub fn add_process(id: &str, ctx: &CommandContext) -> Result<Status> {
    ctx.detector.add_process(id)?;
    added(id, NodeKind::Process, ctx)
}

pub fn add_resource(id: &str, ctx: &CommandContext) -> Result<Status> {
    ctx.detector.add_resource(id)?;
    added(id, NodeKind::Resource, ctx)
}

fn added(id: &str, kind: NodeKind, ctx: &CommandContext) -> Result<Status> {
    ctx.report(&format!("{} {} added.", kind.label(), id))?;
    Ok(Status::Success)
}
