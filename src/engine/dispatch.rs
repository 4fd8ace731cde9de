//! The dispatch loop.
//!
//! One coordinating future pops tasks and hands each to its own blocking
//! worker thread. It only ever suspends on the wake `Notify` (or, with a
//! concurrency limit, on a semaphore permit raced against the stop flag),
//! and it re-checks its predicate after every wake.

use opentelemetry::KeyValue;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::{JoinError, JoinSet};
use tracing::{Span, debug, warn};
use uuid::Uuid;

use super::bot::{Bot, Shared};
use crate::error::{Error, Result};
use crate::model::Task;
use crate::telemetry::metrics;
use crate::telemetry::task::{record_outcome, start_task_span};

impl Bot {
    /// Dispatch until the stop flag is observed. Returns an error only on
    /// an engine invariant violation.
    pub(super) async fn dispatch(&self, in_flight: &mut JoinSet<()>) -> Result<()> {
        loop {
            if !self.wait_for_work().await {
                debug!(bot = %self.shared.name, "dispatch loop observed stop");
                return Ok(());
            }

            let permit = match &self.limiter {
                None => None,
                Some(limiter) => {
                    let acquire = Arc::clone(limiter).acquire_owned();
                    tokio::select! {
                        permit = acquire => Some(permit.map_err(|e| {
                            Error::Other(format!("concurrency limiter closed: {e}"))
                        })?),
                        () = self.shared.stopped() => return Ok(()),
                    }
                }
            };
            if self.shared.stop_requested() {
                return Ok(());
            }

            // Only this loop pops, so the queue cannot have emptied since
            // wait_for_work saw it non-empty.
            let task = self.shared.queue.pop()?;
            self.launch(task, permit, in_flight);

            while let Some(joined) = in_flight.try_join_next() {
                reap(joined);
            }
        }
    }

    /// Block until the queue has work (`true`) or stop is requested
    /// (`false`).
    async fn wait_for_work(&self) -> bool {
        loop {
            let woken = self.shared.wake.notified();
            if self.shared.stop_requested() {
                return false;
            }
            if !self.shared.queue.is_empty() {
                return true;
            }
            woken.await;
        }
    }

    fn launch(&self, task: Task, permit: Option<OwnedSemaphorePermit>, in_flight: &mut JoinSet<()>) {
        let run_id = Uuid::new_v4();
        let span = start_task_span(&task, &run_id);
        span.in_scope(|| debug!("dispatching task"));
        metrics::tasks_dispatched().add(1, &[KeyValue::new("priority", task.priority.as_str())]);

        let guard = InFlight::begin(Arc::clone(&self.shared), &task, span, permit);
        in_flight.spawn_blocking(move || {
            let guard = guard;
            let _entered = guard.span.clone().entered();
            task.run();
        });
    }
}

/// Observe a finished worker. Handler panics were already recorded by the
/// worker's [`InFlight`] guard.
pub(super) fn reap(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        if !e.is_panic() {
            warn!("task worker ended abnormally: {e}");
        }
    }
}

/// Counts a handler as in flight from dispatch until its thread finishes,
/// whether it returned or panicked.
struct InFlight {
    shared: Arc<Shared>,
    task_name: String,
    span: Span,
    started: Instant,
    _permit: Option<OwnedSemaphorePermit>,
}

impl InFlight {
    fn begin(
        shared: Arc<Shared>,
        task: &Task,
        span: Span,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        shared.in_flight.fetch_add(1, Ordering::AcqRel);
        Self {
            shared,
            task_name: task.name.clone(),
            span,
            started: Instant::now(),
            _permit: permit,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let outcome = if std::thread::panicking() {
            "panicked"
        } else {
            "ok"
        };
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;

        metrics::tasks_completed().add(1, &metrics::result_labels(outcome));
        metrics::task_duration_ms().record(duration_ms, &[]);
        record_outcome(&self.span, outcome);
        if outcome == "panicked" {
            warn!(parent: &self.span, task = %self.task_name, "task handler panicked");
        }

        self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
