use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use super::core::Cell;
use crate::exec::Monitor;

/// Type-erased executable task as stored in an executor queue.
pub trait Runnable: Send {
    /// Current priority value of this task.
    fn priority(&self) -> u8;

    /// Whether the task has been canceled and can be dropped from the queue.
    fn is_canceled(&self) -> bool;

    /// Execute the task on the current thread, consuming it.
    fn execute(self: Box<Self>);
}

/// Executable part of a task.
pub struct Task<F, R, M> {
    closure: F,
    cell: Arc<Cell<R>>,
    monitor: Arc<M>,
}

/// Join handle for a task.
pub struct Handle<R> {
    cell: Arc<Cell<R>>,
    monitor: Arc<dyn Monitor + Send + Sync>,
}

/// Join handle for a task, canceling the task when being dropped.
pub struct DropHandle<R> {
    handle: Option<Handle<R>>,
}

impl<F, R, M> Task<F, R, M>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
    M: Monitor + Send + Sync + 'static,
{
    /// Create a new task for the given closure, returning its task- and
    /// join-handle.
    pub fn new(closure: F, monitor: M, priority: u8) -> (Self, Handle<R>) {
        let cell = Arc::new(Cell::new(priority));
        let monitor = Arc::new(monitor);

        let task = Task {
            closure,
            cell: cell.clone(),
            monitor: monitor.clone(),
        };

        let handle = Handle { cell, monitor };

        (task, handle)
    }
}

impl<F, R, M> Runnable for Task<F, R, M>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
    M: Monitor + Send + Sync + 'static,
{
    fn priority(&self) -> u8 {
        self.cell.priority()
    }

    fn is_canceled(&self) -> bool {
        self.cell.is_canceled()
    }

    fn execute(self: Box<Self>) {
        let Task {
            closure,
            cell,
            monitor,
        } = *self;

        // Check whether we're still allowed to run. If the task has been
        // canceled while queued, the closure is simply dropped here.
        if !cell.transition_to_running() {
            return;
        }

        monitor.on_execute();

        // Run the closure and catch any panic. The panic is re-raised on the
        // thread joining the task.
        let result = std::panic::catch_unwind(AssertUnwindSafe(closure));

        cell.complete(result);
        monitor.on_complete();
    }
}

impl<R> Handle<R> {
    /// Check if the associated task has been completed.
    pub fn is_finished(&self) -> bool {
        self.cell.is_complete()
    }

    /// Cancel the associated task.
    ///
    /// Cancels the associated task. Returns `Ok(())` if the task has been
    /// canceled successfully, `Err(self)` if the task could not be canceled
    /// because it is already running or has been completed.
    pub fn cancel(self) -> Result<(), Self> {
        if self.try_cancel() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn try_cancel(&self) -> bool {
        let canceled = self.cell.cancel();
        if canceled {
            self.monitor.on_canceled();
        }
        canceled
    }

    /// Convert this handle into one that cancels the task when dropped.
    pub fn cancel_on_drop(self) -> DropHandle<R> {
        DropHandle { handle: Some(self) }
    }

    pub(crate) fn priority_value(&self) -> u8 {
        self.cell.priority()
    }

    pub(crate) fn set_priority_value(&self, priority: u8) {
        self.cell.set_priority(priority)
    }

    /// Wait for the task to complete and return its result.
    ///
    /// This function will return immediately if the associated task has
    /// already been completed. Non-blocking operations are supported by
    /// checking [`is_finished()`][Self::is_finished()] and calling
    /// [`join()`][Self::join()] only if that returns `true`.
    ///
    /// # Panics
    ///
    /// This function will panic if the associated task function panicked or
    /// if the task has been canceled.
    pub fn join(self) -> R {
        self.cell.wait();
        self.take()
    }

    /// Wait for the task to complete with a timeout and return its result if
    /// successful.
    ///
    /// Returns `Ok(result)` if the task completed within the timeout,
    /// `Err(self)` if this operation timed out.
    ///
    /// # Panics
    ///
    /// This function will panic if the associated task function panicked.
    pub fn join_timeout(self, duration: Duration) -> Result<R, Self> {
        if self.cell.wait_timeout(duration) {
            Ok(self.take())
        } else {
            Err(self)
        }
    }

    fn take(&self) -> R {
        match self.cell.take_result().expect("task canceled or result already taken") {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl<R> DropHandle<R> {
    fn inner(&self) -> &Handle<R> {
        self.handle.as_ref().expect("handle already consumed")
    }

    fn into_inner(mut self) -> Handle<R> {
        self.handle.take().expect("handle already consumed")
    }

    /// Check if the associated task has been completed.
    pub fn is_finished(&self) -> bool {
        self.inner().is_finished()
    }

    /// Cancel the associated task. See [`Handle::cancel()`].
    pub fn cancel(self) -> Result<(), Self> {
        self.into_inner().cancel().map_err(Handle::cancel_on_drop)
    }

    /// Disarm this handle, returning a handle that does not cancel the task
    /// on drop.
    pub fn detach(self) -> Handle<R> {
        self.into_inner()
    }

    pub(crate) fn priority_value(&self) -> u8 {
        self.inner().priority_value()
    }

    pub(crate) fn set_priority_value(&self, priority: u8) {
        self.inner().set_priority_value(priority)
    }

    /// Wait for the task to complete and return its result. See
    /// [`Handle::join()`].
    pub fn join(self) -> R {
        self.into_inner().join()
    }

    /// Wait for the task to complete with a timeout. See
    /// [`Handle::join_timeout()`].
    pub fn join_timeout(self, duration: Duration) -> Result<R, Self> {
        self.into_inner()
            .join_timeout(duration)
            .map_err(Handle::cancel_on_drop)
    }
}

impl<R> Drop for DropHandle<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.try_cancel();
        }
    }
}
