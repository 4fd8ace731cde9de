//! Task execution span helpers.

use tracing::Span;
use uuid::Uuid;

use crate::model::Task;

/// Start the span a dispatched task runs in.
///
/// `run_id` is fresh per dispatch; task names are not unique.
pub fn start_task_span(task: &Task, run_id: &Uuid) -> Span {
    tracing::info_span!(
        "task.run",
        "task.name" = %task.name,
        "task.priority" = %task.priority,
        "task.run_id" = %run_id,
        "task.outcome" = tracing::field::Empty,
    )
}

/// Record how the handler finished on its span.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("task.outcome", outcome);
    span.in_scope(|| {
        tracing::debug!(outcome, "task finished");
    });
}
