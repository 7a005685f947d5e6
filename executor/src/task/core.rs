use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Execution stage of a task, shared between the executing thread and the
/// task handle.
pub enum Stage<R> {
    /// Queued, the closure has not been taken yet.
    Scheduled,

    /// Closure is currently being run on an execution thread.
    Running,

    /// Closure returned or panicked. The result has not been claimed yet.
    Finished(thread::Result<R>),

    /// Result has been claimed by the handle.
    Consumed,

    /// Task has been canceled before it started running.
    Canceled,
}

/// Shared task state.
///
/// The closure itself lives in the executor queue, this cell only tracks the
/// stage, stores the result, and allows waiting for completion.
pub struct Cell<R> {
    stage: Mutex<Stage<R>>,
    signal: Condvar,
    priority: AtomicU8,
}

impl<R> Cell<R> {
    pub fn new(priority: u8) -> Self {
        Cell {
            stage: Mutex::new(Stage::Scheduled),
            signal: Condvar::new(),
            priority: AtomicU8::new(priority),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Stage<R>> {
        // A poisoned lock can only come from a panic while holding the guard,
        // which none of the code below does. Carry on with the inner state.
        self.stage.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::Acquire)
    }

    pub fn set_priority(&self, priority: u8) {
        self.priority.store(priority, Ordering::Release)
    }

    /// Claim the task for execution. Returns `false` if the task has been
    /// canceled in the meantime.
    pub fn transition_to_running(&self) -> bool {
        let mut stage = self.lock();

        match *stage {
            Stage::Scheduled => {
                *stage = Stage::Running;
                true
            }
            _ => false,
        }
    }

    /// Store the result of a running task and wake up all waiters.
    pub fn complete(&self, result: thread::Result<R>) {
        let mut stage = self.lock();
        debug_assert!(matches!(*stage, Stage::Running));

        *stage = Stage::Finished(result);
        self.signal.notify_all();
    }

    /// Try to cancel the task.
    ///
    /// Only succeeds if the task has not started running yet. Returns `true`
    /// if the task is canceled after this call, including when it already had
    /// been canceled before.
    pub fn cancel(&self) -> bool {
        let mut stage = self.lock();

        match *stage {
            Stage::Scheduled => {
                *stage = Stage::Canceled;
                self.signal.notify_all();
                true
            }
            Stage::Canceled => true,
            _ => false,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(*self.lock(), Stage::Canceled)
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            *self.lock(),
            Stage::Finished(_) | Stage::Consumed | Stage::Canceled
        )
    }

    pub fn wait(&self) {
        let guard = self.lock();
        let _guard = self
            .signal
            .wait_while(guard, |s| matches!(s, Stage::Scheduled | Stage::Running))
            .unwrap_or_else(|e| e.into_inner());
    }

    #[must_use]
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let guard = self.lock();
        let (_guard, result) = self
            .signal
            .wait_timeout_while(guard, duration, |s| {
                matches!(s, Stage::Scheduled | Stage::Running)
            })
            .unwrap_or_else(|e| e.into_inner());

        !result.timed_out()
    }

    /// Take the result out of a finished task.
    ///
    /// Returns `None` if the task has not finished, has been canceled, or the
    /// result has already been taken.
    pub fn take_result(&self) -> Option<thread::Result<R>> {
        let mut stage = self.lock();

        if !matches!(*stage, Stage::Finished(_)) {
            return None;
        }

        match std::mem::replace(&mut *stage, Stage::Consumed) {
            Stage::Finished(result) => Some(result),
            _ => unreachable!("invalid state"),
        }
    }
}
