//! # taskbot
//!
//! An assistant bot that runs named tasks on cron schedules.
//!
//! Due tasks go into a priority work queue; a single dispatch loop wakes on
//! demand, pops the most urgent task and runs it on its own worker thread.
//! On SIGINT/SIGTERM the bot stops dispatching, waits for running tasks and
//! drops whatever is still queued. Lifecycle and failure events are sent to
//! notification sinks filtered by severity.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod notifier;
pub mod queue;
pub mod telemetry;
pub mod trigger;
