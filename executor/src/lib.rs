//! Thread-pool executor with prioritized and cancellable tasks.

pub mod exec;
mod task;
