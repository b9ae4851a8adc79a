//! Concurrent units of the room: worker pool, response queue, bot loops.

pub mod autonomy;
pub mod generator;
pub mod pool;
pub mod queue;
pub mod shutdown;

pub use pool::WorkerPool;
pub use shutdown::ShutdownGuard;
