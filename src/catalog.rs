//! Task catalog: scheduled tasks declared in a TOML file.
//!
//! ```toml
//! [[task]]
//! name = "backup"
//! schedule = "0 3 * * *"
//! priority = "high"
//! command = "scripts/backup.sh"
//! args = ["--incremental"]
//! ```
//!
//! Every task runs an external command. The command reports its own
//! failures through the bot's notification fan-out.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::runtime::Handle;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::model::{Priority, Task};
use crate::notifier::Notifications;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "task")]
    tasks: Vec<TaskDefinition>,
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    /// Cron expression, five, six or seven fields.
    pub schedule: String,
    #[serde(default)]
    pub priority: Priority,
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl TaskDefinition {
    /// Build the runnable task. Failures are logged and sent to
    /// `notifications` at error level by the handler itself.
    pub fn into_task(self, notifications: Notifications) -> Task {
        let name = self.name.clone();
        let priority = self.priority;
        Task::new(name, move || {
            if let Err(e) = self.run_command() {
                error!(task = %self.name, "task command failed: {e}");
                report_failure(&notifications, &self.name, &e);
            }
        })
        .priority(priority)
    }

    fn run_command(&self) -> Result<()> {
        // Relative paths resolve against the process CWD.
        let command = if self.command.is_relative() {
            std::env::current_dir()?.join(&self.command)
        } else {
            self.command.clone()
        };

        debug!(task = %self.name, command = %command.display(), "running task command");

        let status = Command::new(&command)
            .args(&self.args)
            .env("TASKBOT_TASK_NAME", &self.name)
            .env("TASKBOT_TASK_PRIORITY", self.priority.as_str())
            .status()
            .map_err(|e| Error::Other(format!("cannot run {}: {e}", command.display())))?;

        if status.success() {
            info!(task = %self.name, "task command succeeded");
            Ok(())
        } else {
            Err(Error::Other(format!(
                "{} exited with status {}",
                command.display(),
                status.code().unwrap_or(-1)
            )))
        }
    }
}

/// Called on a blocking worker thread; drives the async fan-out through the
/// runtime handle that thread inherits. Without a runtime, only the log line
/// remains.
fn report_failure(notifications: &Notifications, task_name: &str, e: &Error) {
    let Ok(runtime) = Handle::try_current() else {
        return;
    };
    runtime.block_on(notifications.error(
        "Task failed",
        &format!("'{task_name}' failed: {e}"),
    ));
}

/// Task definitions loaded from a file.
#[derive(Debug, Default)]
pub struct TaskCatalog {
    tasks: Vec<TaskDefinition>,
}

impl TaskCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read task file {}: {e}", path.display()))
        })?;
        Self::parse(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("bad task file {}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        for def in &file.tasks {
            if def.name.trim().is_empty() {
                return Err(Error::Config("task with an empty name".to_string()));
            }
        }

        Ok(Self { tasks: file.tasks })
    }

    pub fn tasks(&self) -> &[TaskDefinition] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl IntoIterator for TaskCatalog {
    type Item = TaskDefinition;
    type IntoIter = std::vec::IntoIter<TaskDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}
