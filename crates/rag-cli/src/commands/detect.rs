//! `rag detect` command implementation.
//!
//! Prints every cycle found in canonical form, one per line. With
//! `--fail-on-deadlock` a deadlock turns into exit status 2 so scripts can
//! gate on it.

use anyhow::Result;
use rag_graph::DetectionResult;

use super::{CommandContext, Status};

/// Execute the `rag detect` command
pub fn execute(fail_on_deadlock: bool, ctx: &CommandContext) -> Result<Status> {
    let result = ctx.detector.detect_deadlock();

    if ctx.output.is_json() {
        ctx.output.json(&result)?;
    } else {
        print_result(&result, ctx);
    }

    if result.has_deadlock && fail_on_deadlock {
        Ok(Status::Deadlock)
    } else {
        Ok(Status::Success)
    }
}

fn print_result(result: &DetectionResult, ctx: &CommandContext) {
    if !result.has_deadlock {
        ctx.output.success("No deadlock detected.");
        return;
    }

    let count = result.cycles.len();
    ctx.output.warn(&format!(
        "Deadlock detected: {} cycle{}{}",
        count,
        if count == 1 { "" } else { "s" },
        if result.truncated { " (list incomplete)" } else { "" }
    ));

    for (i, cycle) in result.cycles.iter().enumerate() {
        ctx.output.line(&format!("  {}. {}", i + 1, cycle));
    }

    if result.truncated {
        let limits = ctx.detector.limits();
        let deadline = match limits.deadline {
            Some(budget) => format!(" or the {} ms deadline", budget.as_millis()),
            None => String::new(),
        };
        ctx.output.info(&format!(
            "Enumeration stopped at the cap of {} cycles{}; raise --max-cycles to see more.",
            limits.max_cycles, deadline
        ));
    }
}
