//! Core data model.
//!
//! A task is something the bot runs on a schedule: a name for humans, a
//! priority for the dispatcher, and a handler that does the actual work.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Dispatch priority. Higher runs first when several tasks are queued.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", from = "String")]
#[repr(u8)]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Lenient: anything that isn't exactly `low`, `normal` or `high` is
/// `Normal`, so a typo in a task file never stops the bot from starting.
impl FromStr for Priority {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Normal,
        })
    }
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::from(s.as_str())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Side-effecting work run by a task. Shared, because a scheduled task
/// enqueues a fresh copy of itself every time its trigger fires.
pub type Handler = Arc<dyn Fn() + Send + Sync + 'static>;

/// A named, prioritized unit of work.
#[derive(Clone)]
pub struct Task {
    /// Human-readable identifier. Not unique; only used in logs and
    /// notification text.
    pub name: String,
    pub priority: Priority,
    handler: Handler,
}

impl Task {
    /// Create a task at `Normal` priority.
    pub fn new(name: impl Into<String>, handler: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            priority: Priority::Normal,
            handler: Arc::new(handler),
        }
    }

    /// Create a task from an already-shared handler.
    pub fn from_handler(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            priority: Priority::Normal,
            handler,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Run the handler on the current thread.
    pub fn run(&self) {
        (self.handler)();
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task{{name: '{}'}}", self.name)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
