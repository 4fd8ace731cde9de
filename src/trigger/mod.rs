//! Trigger sources: things that call back into the bot when a task is due.

pub mod cron;

use std::sync::Arc;

use crate::error::Result;

pub use self::cron::CronTrigger;

/// Invoked every time a registered schedule fires.
pub type TriggerCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// A time-based event source.
///
/// `register` must report a bad schedule expression as an error rather than
/// panicking. `start` and `stop` are called by the bot from inside its tokio
/// runtime.
pub trait Trigger: Send + Sync {
    fn register(&self, expression: &str, callback: TriggerCallback) -> Result<()>;

    /// Begin firing registered callbacks.
    fn start(&self);

    /// Stop firing. Callbacks already running are not interrupted.
    fn stop(&self);
}
