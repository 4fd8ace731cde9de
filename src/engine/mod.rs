//! Scheduler engine: the bot, its dispatch loop and the shutdown drain.

pub mod bot;
mod dispatch;
mod signals;
pub mod state;

pub use bot::{Bot, BotHandle, BotOptions};
pub use state::BotState;
