//! Work-queue executors with cancellable work items.
//!
//! Work items are queued until an execution thread picks them up. Canceling
//! a queued item marks it as dead, it is then dropped from the queue without
//! ever running its closure. Items that are already running cannot be
//! interrupted, but their handle can be dropped to discard the result.

pub mod priority;

pub use crate::task::{DropHandle, Handle};

/// Monitor trait to monitor the progress of a task.
pub trait Monitor {
    /// Executed when the task starts executing its closure.
    fn on_execute(&self) {}

    /// Executed when the task finished executing its closure, either
    /// successfully or via a panic.
    fn on_complete(&self) {}

    /// Executed when the task has been canceled successfully.
    fn on_canceled(&self) {}
}

impl Monitor for () {}

impl<M: Monitor + ?Sized> Monitor for std::sync::Arc<M> {
    fn on_execute(&self) {
        (**self).on_execute()
    }

    fn on_complete(&self) {
        (**self).on_complete()
    }

    fn on_canceled(&self) {
        (**self).on_canceled()
    }
}

/// Monitor that forwards task completion to a channel.
///
/// Useful to wake up an event loop that polls for finished tasks.
#[derive(Debug, Clone)]
pub struct ChannelMonitor {
    sender: std::sync::mpsc::Sender<()>,
}

impl ChannelMonitor {
    pub fn new(sender: std::sync::mpsc::Sender<()>) -> Self {
        Self { sender }
    }
}

impl Monitor for ChannelMonitor {
    fn on_complete(&self) {
        // the receiving end may be gone already, nothing left to notify then
        let _ = self.sender.send(());
    }
}
