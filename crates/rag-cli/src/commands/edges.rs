//! `rag request` and `rag allocate`.
//!
//! Both take the process first and the resource second; the edge direction
//! is decided by the detector.

use anyhow::Result;

use super::{CommandContext, Status};

pub fn request(process: &str, resource: &str, ctx: &CommandContext) -> Result<Status> {
    ctx.detector.request_resource(process, resource)?;
    ctx.report(&format!("Process {} requested Resource {}.", process, resource))?;
    Ok(Status::Success)
}

pub fn allocate(process: &str, resource: &str, ctx: &CommandContext) -> Result<Status> {
    ctx.detector.allocate_resource(process, resource)?;
    ctx.report(&format!("Resource {} allocated to Process {}.", resource, process))?;
    Ok(Status::Success)
}
