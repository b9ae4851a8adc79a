//! Multi-bot chat room engine.
//!
//! Lock discipline: the transcript (`SharedChat`) and the bot table
//! (`BotRegistry`) each keep their mutex private and release it before any
//! method returns. The worker pool's semaphore and the response queue carry
//! their own internal synchronization. No path holds two of these at once.

pub mod bots;
pub mod chat;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod io;
pub mod room;
pub mod runtime;
pub mod types;

pub use config::{Credentials, RoomCfg};
pub use error::RoomError;
pub use room::{LineOutcome, Room, RoomRuntime};
