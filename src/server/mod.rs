//! Listening socket and the bounded pool of connection handlers.

pub mod listener;
pub mod pool;

pub use pool::WorkerPool;
