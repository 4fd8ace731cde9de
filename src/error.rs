//! Error types for taskbot.

use thiserror::Error;

use crate::engine::BotState;

#[derive(Debug, Error)]
pub enum Error {
    /// Pop on an empty queue. Inside the engine this means the dispatch
    /// discipline was broken.
    #[error("work queue underflow: pop called on an empty queue")]
    QueueUnderflow,

    #[error("invalid bot state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: BotState, to: BotState },

    #[error("bot is shutting down, task not accepted")]
    ShuttingDown,

    #[error("invalid schedule '{expression}': {reason}")]
    Schedule { expression: String, reason: String },

    #[error("notification via {sink} failed: {reason}")]
    Notification { sink: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
