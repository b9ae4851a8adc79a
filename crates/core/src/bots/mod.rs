//! Bot population: per-bot memory, the shared registry, and persona prompts.

pub mod memory;
pub mod persona;
pub mod registry;

pub use memory::MemoryStore;
pub use registry::{BotDescriptor, BotRegistry, Departure, MAX_BOTS};
