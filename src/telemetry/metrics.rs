//! Metric instrument factories for taskbot.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op and these cost
//! next to nothing.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("taskbot")
}

/// `result` label shared by the counters below.
pub fn result_labels(result: &'static str) -> [KeyValue; 1] {
    [KeyValue::new("result", result)]
}

/// Counter: tasks pushed onto the work queue.
/// Labels: `priority`.
pub fn tasks_queued() -> Counter<u64> {
    meter()
        .u64_counter("taskbot.tasks.queued")
        .with_description("Number of tasks pushed onto the work queue")
        .build()
}

/// Counter: tasks refused because the bot was shutting down.
pub fn tasks_rejected() -> Counter<u64> {
    meter()
        .u64_counter("taskbot.tasks.rejected")
        .with_description("Number of tasks refused during shutdown")
        .build()
}

/// Counter: tasks popped and handed to a worker thread.
/// Labels: `priority`.
pub fn tasks_dispatched() -> Counter<u64> {
    meter()
        .u64_counter("taskbot.tasks.dispatched")
        .with_description("Number of tasks dispatched to workers")
        .build()
}

/// Counter: task handlers that returned.
/// Labels: `result` ("ok" | "panicked").
pub fn tasks_completed() -> Counter<u64> {
    meter()
        .u64_counter("taskbot.tasks.completed")
        .with_description("Number of task handlers that finished")
        .build()
}

/// Counter: queued tasks dropped at shutdown without running.
pub fn tasks_abandoned() -> Counter<u64> {
    meter()
        .u64_counter("taskbot.tasks.abandoned")
        .with_description("Number of queued tasks abandoned at shutdown")
        .build()
}

/// Histogram: task handler wall time in milliseconds.
pub fn task_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("taskbot.task.duration_ms")
        .with_description("Task handler duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Counter: notification delivery attempts.
/// Labels: `result` ("ok" | "error").
pub fn notifications() -> Counter<u64> {
    meter()
        .u64_counter("taskbot.notifications")
        .with_description("Number of notification delivery attempts")
        .build()
}
