//! Cron-expression trigger backed by the `cron` crate.
//!
//! Each registered schedule gets its own tokio task that sleeps until the
//! next firing time, invokes the callback and goes back to sleep. All of
//! them share one cancellation token so `stop` ends every loop at once.

use chrono::{DateTime, Utc};
use ::cron::Schedule;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{Trigger, TriggerCallback};
use crate::error::{Error, Result};

/// Parse a cron expression.
///
/// Classic five-field expressions (`min hour dom month dow`) get a `0`
/// seconds field prepended, and their numeric weekdays (0-7, Sunday is 0 or
/// 7) are renumbered to the `cron` crate's 1-7 with Sunday as 1. Six and
/// seven field expressions and `@daily` style descriptors are passed through
/// unchanged.
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    let invalid = |reason: String| Error::Schedule {
        expression: expression.to_string(),
        reason,
    };

    let trimmed = expression.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let normalized = match fields.as_slice() {
        [minute, hour, dom, month, dow] => {
            let dow = classic_weekdays(dow).map_err(invalid)?;
            format!("0 {minute} {hour} {dom} {month} {dow}")
        }
        _ => trimmed.to_string(),
    };

    Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))
}

/// Rewrite a classic day-of-week field into the `cron` crate's numbering.
///
/// `*` and `*/n` keep their meaning under the shift and pass through, as do
/// day names. Numeric values, ranges and stepped ranges are expanded and
/// renumbered.
fn classic_weekdays(field: &str) -> std::result::Result<String, String> {
    let mut days = BTreeSet::new();
    let mut passthrough = Vec::new();

    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => {
                let step: u8 = step
                    .parse()
                    .map_err(|_| format!("invalid day-of-week step '{step}'"))?;
                if step == 0 {
                    return Err("day-of-week step must be positive".to_string());
                }
                (base, Some(step))
            }
            None => (item, None),
        };

        if base == "*" || !base.starts_with(|c: char| c.is_ascii_digit()) {
            passthrough.push(item.to_string());
            continue;
        }

        let weekday = |v: &str| -> std::result::Result<u8, String> {
            match v.parse::<u8>() {
                Ok(day) if day <= 7 => Ok(day),
                _ => Err(format!("day of week '{v}' is not in 0-7")),
            }
        };
        let (first, last) = match base.split_once('-') {
            Some((first, last)) => (weekday(first)?, weekday(last)?),
            // `n/step` runs from n to the end of the week.
            None if step.is_some() => (weekday(base)?, 6),
            None => {
                let day = weekday(base)?;
                (day, day)
            }
        };
        if first > last {
            return Err(format!("day-of-week range '{base}' runs backwards"));
        }

        let step = usize::from(step.unwrap_or(1));
        days.extend((first..=last).step_by(step).map(|day| day % 7 + 1));
    }

    passthrough.extend(days.iter().map(u8::to_string));
    Ok(passthrough.join(","))
}

/// Next firing time of `schedule` strictly after `after`.
pub fn next_fire(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

struct Entry {
    expression: String,
    schedule: Schedule,
    callback: TriggerCallback,
}

struct Running {
    runtime: Handle,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Arc<Entry>>,
    running: Option<Running>,
}

#[derive(Default)]
pub struct CronTrigger {
    inner: Mutex<Inner>,
}

impl CronTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successfully registered schedules.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Trigger for CronTrigger {
    fn register(&self, expression: &str, callback: TriggerCallback) -> Result<()> {
        let schedule = parse_schedule(expression)?;
        let entry = Arc::new(Entry {
            expression: expression.to_string(),
            schedule,
            callback,
        });

        let mut inner = self.lock();
        if let Some(running) = &inner.running {
            running
                .runtime
                .spawn(fire_loop(Arc::clone(&entry), running.cancel.clone()));
        }
        inner.entries.push(entry);
        debug!(expression, "schedule registered");
        Ok(())
    }

    fn start(&self) {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("cron trigger started outside a tokio runtime: {e}");
                return;
            }
        };

        let mut inner = self.lock();
        if inner.running.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        for entry in &inner.entries {
            runtime.spawn(fire_loop(Arc::clone(entry), cancel.clone()));
        }
        info!(schedules = inner.entries.len(), "cron trigger started");
        inner.running = Some(Running { runtime, cancel });
    }

    fn stop(&self) {
        if let Some(running) = self.lock().running.take() {
            running.cancel.cancel();
            info!("cron trigger stopped");
        }
    }
}

impl Drop for CronTrigger {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn fire_loop(entry: Arc<Entry>, cancel: CancellationToken) {
    let mut after = Utc::now();
    loop {
        let Some(next) = next_fire(&entry.schedule, after) else {
            debug!(expression = %entry.expression, "schedule has no upcoming times");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(wait) => {}
        }

        debug!(expression = %entry.expression, at = %next, "schedule fired");
        (entry.callback)();
        after = next.max(Utc::now());
    }
}
