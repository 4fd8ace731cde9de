//! The bot: owns the work queue, registers tasks with the trigger source
//! and runs the dispatch loop until a termination signal arrives.

use opentelemetry::KeyValue;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::signals::listen_for_termination;
use super::state::BotState;
use crate::error::{Error, Result};
use crate::model::Task;
use crate::notifier::{Notifications, Notifier, Status};
use crate::queue::WorkQueue;
use crate::telemetry::metrics;
use crate::trigger::{CronTrigger, Trigger, TriggerCallback};

/// Options for a newly created bot.
pub struct BotOptions {
    /// Where notifications go. Empty means none are sent.
    pub notifiers: Vec<Arc<dyn Notifier>>,
    /// Minimum status a notification needs to be sent at all.
    pub notification_level: Status,
    /// Maximum number of task handlers running at once. `0` is unlimited.
    pub max_concurrency: usize,
    /// Trigger source. Defaults to a [`CronTrigger`].
    pub trigger: Option<Arc<dyn Trigger>>,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            notifiers: Vec::new(),
            notification_level: Status::Info,
            max_concurrency: 0,
            trigger: None,
        }
    }
}

/// State shared between the bot, its handles, trigger callbacks and the
/// worker threads.
pub(super) struct Shared {
    pub(super) name: String,
    pub(super) queue: WorkQueue,
    /// Paired with every push and with the stop request.
    pub(super) wake: Notify,
    stop: AtomicBool,
    state: Mutex<BotState>,
    pub(super) in_flight: AtomicUsize,
    pub(super) notifications: Notifications,
}

impl Shared {
    pub(super) fn enqueue(&self, task: Task) -> Result<()> {
        let name = task.name.clone();
        let priority = task.priority;
        if let Err(e) = self.queue.push_unless(task, &self.stop) {
            metrics::tasks_rejected().add(1, &[]);
            return Err(e);
        }

        info!(task = %name, %priority, "task queued");
        metrics::tasks_queued().add(1, &[KeyValue::new("priority", priority.as_str())]);
        self.wake.notify_one();
        Ok(())
    }

    /// Set the stop flag, move a running bot to `Draining` and wake the
    /// dispatcher. Only the first call signals.
    pub(super) fn request_stop(&self) {
        let first = !self.stop.swap(true, Ordering::AcqRel);

        let mut state = self.lock_state();
        if *state == BotState::Running {
            debug!(bot = %self.name, from = "running", to = "draining", "state_transition");
            *state = BotState::Draining;
        }
        drop(state);

        if first {
            self.wake.notify_one();
        }
    }

    pub(super) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Resolves once the stop flag is set.
    pub(super) async fn stopped(&self) {
        loop {
            let woken = self.wake.notified();
            if self.stop_requested() {
                return;
            }
            woken.await;
        }
    }

    pub(super) fn state(&self) -> BotState {
        *self.lock_state()
    }

    fn transition(&self, to: BotState) -> Result<()> {
        let mut state = self.lock_state();
        let from = *state;
        if !from.can_transition_to(to) {
            return Err(Error::InvalidTransition { from, to });
        }
        debug!(bot = %self.name, %from, %to, "state_transition");
        *state = to;
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, BotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle for talking to a bot from other tasks or threads.
#[derive(Clone)]
pub struct BotHandle {
    shared: Arc<Shared>,
}

impl BotHandle {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Same as a termination signal: stop dispatching, let in-flight tasks
    /// finish. If the bot has not started yet, its next `start` drains
    /// immediately.
    pub fn shutdown(&self) {
        info!(bot = %self.shared.name, "shutdown requested");
        self.shared.request_stop();
    }

    /// Queue a task for immediate dispatch.
    ///
    /// # Errors
    ///
    /// [`Error::ShuttingDown`] once a stop has been requested.
    pub fn enqueue(&self, task: Task) -> Result<()> {
        self.shared.enqueue(task)
    }

    pub fn state(&self) -> BotState {
        self.shared.state()
    }

    /// Tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Task handlers currently running.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }
}

/// An assistant bot.
pub struct Bot {
    pub(super) shared: Arc<Shared>,
    trigger: Arc<dyn Trigger>,
    pub(super) limiter: Option<Arc<Semaphore>>,
}

impl Bot {
    /// Create a new bot.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `name` is blank.
    pub fn new(name: impl Into<String>, opts: BotOptions) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Config("bot name must not be empty".to_string()));
        }

        if opts.notifiers.is_empty() {
            warn!(bot = %name, "no notifiers were specified, no notifications will be sent");
        }

        let limiter = match opts.max_concurrency {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };
        let trigger = opts
            .trigger
            .unwrap_or_else(|| Arc::new(CronTrigger::new()) as Arc<dyn Trigger>);
        let notifications = Notifications::new(&name, opts.notifiers, opts.notification_level);

        Ok(Self {
            shared: Arc::new(Shared {
                name,
                queue: WorkQueue::new(),
                wake: Notify::new(),
                stop: AtomicBool::new(false),
                state: Mutex::new(BotState::Idle),
                in_flight: AtomicUsize::new(0),
                notifications,
            }),
            trigger,
            limiter,
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn handle(&self) -> BotHandle {
        BotHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> BotState {
        self.shared.state()
    }

    /// The bot's notification fan-out. Task handlers clone it to report
    /// their own failures.
    pub fn notifications(&self) -> &Notifications {
        &self.shared.notifications
    }

    /// Queue a task for immediate dispatch. See [`BotHandle::enqueue`].
    pub fn enqueue(&self, task: Task) -> Result<()> {
        self.shared.enqueue(task)
    }

    /// Run `task` every time `schedule` fires.
    ///
    /// A bad schedule is logged and reported as an error notification
    /// before it is returned; the bot itself is unaffected and other tasks
    /// keep running.
    pub async fn schedule_task(&self, schedule: &str, task: Task) -> Result<()> {
        let task_name = task.name.clone();
        let shared = Arc::clone(&self.shared);
        let callback: TriggerCallback = Arc::new(move || {
            if let Err(e) = shared.enqueue(task.clone()) {
                debug!(task = %task.name, "schedule fired but task not queued: {e}");
            }
        });

        match self.trigger.register(schedule, callback) {
            Ok(()) => {
                info!(task = %task_name, schedule, "task scheduled");
                Ok(())
            }
            Err(e) => {
                error!(task = %task_name, schedule, "unable to schedule task: {e}");
                self.shared
                    .notifications
                    .error(
                        "Unable to schedule task",
                        &format!(
                            "{} was unable to schedule '{}' task",
                            self.shared.name, task_name
                        ),
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Run the bot until a termination signal (or [`BotHandle::shutdown`])
    /// and every dispatched task has finished.
    ///
    /// Tasks still queued when the stop arrives are dropped without running.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] if the bot was already started. An
    /// engine invariant violation inside the dispatch loop is returned after
    /// in-flight tasks have drained.
    pub async fn start(&self) -> Result<()> {
        self.shared.transition(BotState::Running)?;
        let name = self.shared.name.as_str();

        info!(bot = %name, "starting bot");
        self.shared
            .notifications
            .debug("Starting bot", "Bot is being started up")
            .await;

        let listener = tokio::spawn(listen_for_termination(Arc::clone(&self.shared)));
        self.trigger.start();

        let mut in_flight = JoinSet::new();
        let dispatched = self.dispatch(&mut in_flight).await;
        if let Err(e) = &dispatched {
            error!(bot = %name, "dispatch loop failed: {e}");
            self.shared
                .notifications
                .error("Dispatch loop failed", &format!("{name}: {e}"))
                .await;
        }

        self.trigger.stop();
        listener.abort();
        self.shared.request_stop();

        let abandoned = self.shared.queue.drain();
        if !abandoned.is_empty() {
            let tasks: Vec<&str> = abandoned.iter().map(|t| t.name.as_str()).collect();
            info!(bot = %name, count = abandoned.len(), ?tasks, "abandoning queued tasks");
            metrics::tasks_abandoned().add(abandoned.len() as u64, &[]);
        }

        debug!(bot = %name, running = in_flight.len(), "waiting for running tasks to complete");
        while let Some(joined) = in_flight.join_next().await {
            super::dispatch::reap(joined);
        }

        self.shared.transition(BotState::Stopped)?;
        info!(bot = %name, "stopping bot");
        self.shared
            .notifications
            .debug("Stopping bot", "Bot is being shutdown")
            .await;

        dispatched
    }
}
