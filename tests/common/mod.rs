//! Shared fakes for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskbot::error::{Error, Result};
use taskbot::notifier::{Notifier, Status};
use taskbot::trigger::{Trigger, TriggerCallback};

/// One delivered notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub bot_name: String,
    pub status: Status,
    pub title: String,
    pub body: String,
}

/// Sink that records every delivery attempt, optionally failing each one.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.title).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_notification(
        &self,
        bot_name: &str,
        status: Status,
        title: &str,
        body: &str,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(Sent {
            bot_name: bot_name.to_string(),
            status,
            title: title.to_string(),
            body: body.to_string(),
        });
        if self.fail {
            Err(Error::Notification {
                sink: "recording".to_string(),
                reason: "configured to fail".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Trigger fired by hand. The expression `"invalid"` is rejected.
#[derive(Default)]
pub struct ManualTrigger {
    callbacks: Mutex<Vec<(String, TriggerCallback)>>,
    running: AtomicBool,
}

impl ManualTrigger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Invoke every callback registered under `expression`.
    pub fn fire(&self, expression: &str) {
        let callbacks: Vec<TriggerCallback> = self
            .callbacks
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == expression)
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn registered(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }
}

impl Trigger for ManualTrigger {
    fn register(&self, expression: &str, callback: TriggerCallback) -> Result<()> {
        if expression == "invalid" {
            return Err(Error::Schedule {
                expression: expression.to_string(),
                reason: "rejected by ManualTrigger".to_string(),
            });
        }
        self.callbacks
            .lock()
            .unwrap()
            .push((expression.to_string(), callback));
        Ok(())
    }

    fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Poll `condition` every few milliseconds; panic after `limit`.
pub async fn wait_until(limit: Duration, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + limit;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {limit:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
