//! Status notifications: severity levels, the sink trait, and the fan-out
//! that filters by a minimum level and delivers to every sink.

pub mod pushbullet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::telemetry::metrics;

pub use pushbullet::PushbulletNotifier;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Notification severity, ordered `Debug < Info < Warn < Error`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(i8)]
pub enum Status {
    Debug = -1,
    #[default]
    Info = 0,
    Warn = 1,
    Error = 2,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Debug => "debug",
            Status::Info => "info",
            Status::Warn => "warn",
            Status::Error => "error",
        }
    }

    /// Marker prepended to notification titles.
    pub fn icon(self) -> &'static str {
        match self {
            Status::Debug => "🚧",
            Status::Info => "ℹ️",
            Status::Warn => "⚠️",
            Status::Error => "💥",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "debug" => Ok(Status::Debug),
            "info" => Ok(Status::Info),
            "warn" => Ok(Status::Warn),
            "error" => Ok(Status::Error),
            other => Err(Error::Config(format!(
                "invalid notification level '{other}', expected one of: debug, info, warn, error"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Something that can deliver a notification to the bot's owner.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short sink name used in logs.
    fn name(&self) -> &str;

    async fn send_notification(
        &self,
        bot_name: &str,
        status: Status,
        title: &str,
        body: &str,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Broadcasts notifications at or above `threshold` to every sink.
///
/// Cheap to clone; task handlers hold their own copy so they can report
/// their failures.
#[derive(Clone)]
pub struct Notifications {
    bot_name: Arc<str>,
    sinks: Arc<[Arc<dyn Notifier>]>,
    threshold: Status,
}

impl Notifications {
    pub fn new(bot_name: &str, sinks: Vec<Arc<dyn Notifier>>, threshold: Status) -> Self {
        Self {
            bot_name: Arc::from(bot_name),
            sinks: Arc::from(sinks),
            threshold,
        }
    }

    pub fn threshold(&self) -> Status {
        self.threshold
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver to every sink. Each sink gets one attempt; failures are
    /// logged and do not stop delivery to the rest.
    pub async fn notify(&self, status: Status, title: &str, body: &str) {
        if status < self.threshold {
            debug!(%status, title, "notification below threshold, dropped");
            return;
        }

        let title = format!("{} {}", status.icon(), title);
        for sink in self.sinks.iter() {
            match sink
                .send_notification(&self.bot_name, status, &title, body)
                .await
            {
                Ok(()) => metrics::notifications().add(1, &metrics::result_labels("ok")),
                Err(e) => {
                    metrics::notifications().add(1, &metrics::result_labels("error"));
                    error!(sink = sink.name(), "unable to send notification: {e}");
                }
            }
        }
    }

    pub async fn debug(&self, title: &str, body: &str) {
        self.notify(Status::Debug, title, body).await;
    }

    pub async fn info(&self, title: &str, body: &str) {
        self.notify(Status::Info, title, body).await;
    }

    pub async fn warn(&self, title: &str, body: &str) {
        self.notify(Status::Warn, title, body).await;
    }

    pub async fn error(&self, title: &str, body: &str) {
        self.notify(Status::Error, title, body).await;
    }
}
