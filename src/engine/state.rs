//! Bot lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the bot is in its lifecycle. Transitions only move forward:
/// `Idle -> Running -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotState {
    /// Constructed, not started.
    Idle,
    /// Accepting triggers and dispatching tasks.
    Running,
    /// Stop requested. Nothing new is dispatched; in-flight tasks finish.
    Draining,
    /// Every dispatched task finished. Terminal.
    Stopped,
}

impl BotState {
    pub fn can_transition_to(self, to: BotState) -> bool {
        use BotState::*;
        matches!(
            (self, to),
            (Idle, Running) | (Running, Draining) | (Draining, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == BotState::Stopped
    }
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BotState::Idle => "idle",
            BotState::Running => "running",
            BotState::Draining => "draining",
            BotState::Stopped => "stopped",
        };
        f.pad(s)
    }
}
