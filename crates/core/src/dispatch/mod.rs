//! Who answers a message, and getting their turns onto the worker pool.

pub mod decision;
pub mod dispatcher;

pub use decision::{ResponsePolicy, Verdict, is_mentioned};
pub use dispatcher::{DispatchSummary, Dispatcher};
