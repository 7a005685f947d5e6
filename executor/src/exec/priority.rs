//! A thread-pool based executor with support for task priorities.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::task::{self, Runnable, Task};

use super::Monitor;

type TaskBox = Box<dyn Runnable>;

/// A priority enum.
///
/// Priority values are arranged from `0` (lowest, inclusively) to
/// `Self::count() - 1` (highest).
pub trait Priority: Sized + Copy {
    /// The maximum number of supported priorities.
    fn count() -> u8;

    /// Returns the priority instance for the given value.
    fn from_value(value: u8) -> Option<Self>;

    /// The priority value of this instance.
    fn as_value(&self) -> u8;
}

/// A basic thread-pool executor with a fixed number of threads and cancellable
/// tasks.
///
/// Tasks with higher priority are executed first. Tasks with equal priority
/// are executed in submission order.
pub struct Executor<P> {
    inner: Arc<ExecutorStruct>,

    /// Handles to the execution threads
    threads: Vec<JoinHandle<()>>,

    /// Marker for priority.
    _marker: PhantomData<P>,
}

/// Remote handle for a task.
pub struct Handle<P, R> {
    base: task::Handle<R>,
    exec: Arc<ExecutorStruct>,
    _marker: PhantomData<P>,
}

/// Remote handle for a task, canceling the task when being dropped.
pub struct DropHandle<P, R> {
    base: task::DropHandle<R>,
    exec: Arc<ExecutorStruct>,
    _marker: PhantomData<P>,
}

struct ExecutorStruct {
    /// Task queue in submission order
    queue: Mutex<VecDeque<TaskBox>>,

    /// Condition variable for signaling arrival of new work items
    signal: Condvar,

    /// Whether to keep the queue running
    running: AtomicBool,
}

impl<P: Priority> Executor<P> {
    pub fn new(num_threads: u32) -> Self {
        let inner = ExecutorStruct {
            queue: Mutex::new(VecDeque::new()),
            signal: Condvar::new(),
            running: AtomicBool::new(true),
        };
        let inner = Arc::new(inner);

        let threads = (0..num_threads)
            .map(|_| {
                let exec = inner.clone();
                std::thread::spawn(move || exec.process())
            })
            .collect();

        Executor {
            inner,
            threads,
            _marker: PhantomData,
        }
    }

    pub fn submit<F, R>(&self, priority: P, closure: F) -> Handle<P, R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.submit_with((), priority, closure)
    }

    pub fn submit_with<F, R, M>(&self, monitor: M, priority: P, closure: F) -> Handle<P, R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
        M: Monitor + Send + Sync + 'static,
    {
        let (task, handle) = Task::new(closure, monitor, priority.as_value());

        self.inner.push(Box::new(task));

        Handle::new(handle, self.inner.clone())
    }

    /// Number of tasks waiting in the queue, including canceled ones that
    /// have not been cleaned up yet.
    pub fn queued(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn shutdown(&mut self) {
        // tell all threads to shut down
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.signal.notify_all();

        // wait for all threads to finish, ignore any panics
        let threads = std::mem::take(&mut self.threads);
        for handle in threads {
            let _ = handle.join();
        }
    }
}

impl<P> Drop for Executor<P> {
    fn drop(&mut self) {
        // tell all threads to shut down
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.signal.notify_all();
    }
}

impl ExecutorStruct {
    fn lock(&self) -> MutexGuard<'_, VecDeque<TaskBox>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, task: TaskBox) {
        let mut queue = self.lock();

        queue.push_back(task);
        self.signal.notify_one();
    }

    fn pop(&self) -> Option<TaskBox> {
        let mut queue = self.lock();

        while self.running.load(Ordering::SeqCst) {
            // drop canceled tasks, their closures will never run
            queue.retain(|task| !task.is_canceled());

            // find the first task with the highest priority
            let next = queue
                .iter()
                .enumerate()
                .fold(None, |best: Option<(usize, u8)>, (i, task)| {
                    let prio = task.priority();
                    match best {
                        Some((_, p)) if p >= prio => best,
                        _ => Some((i, prio)),
                    }
                });

            if let Some((index, _)) = next {
                return queue.remove(index);
            }

            queue = self.signal.wait(queue).unwrap_or_else(|e| e.into_inner());
        }

        None
    }

    fn process(&self) {
        while let Some(task) = self.pop() {
            task.execute()
        }
    }
}

impl<P, R> Handle<P, R> {
    fn new(base: task::Handle<R>, exec: Arc<ExecutorStruct>) -> Self {
        Self {
            base,
            exec,
            _marker: PhantomData,
        }
    }

    /// Check if the associated task has been completed.
    pub fn is_finished(&self) -> bool {
        self.base.is_finished()
    }

    /// Cancel the associated task.
    ///
    /// Returns `Ok(())` if the task has been canceled successfully,
    /// `Err(self)` if the task is already running or has been completed.
    pub fn cancel(self) -> Result<(), Self> {
        let exec = self.exec;

        match self.base.cancel() {
            Ok(()) => {
                // wake up a worker so the dead task gets removed from the queue
                exec.signal.notify_one();
                Ok(())
            }
            Err(base) => Err(Handle::new(base, exec)),
        }
    }

    /// Convert this handle into one that cancels the task when dropped.
    pub fn cancel_on_drop(self) -> DropHandle<P, R> {
        DropHandle::new(self.base.cancel_on_drop(), self.exec)
    }

    /// Wait for the task to complete and return its result.
    ///
    /// # Panics
    ///
    /// This function will panic if the associated task function panicked.
    pub fn join(self) -> R {
        self.base.join()
    }

    /// Wait for the task to complete with a timeout and return its result if
    /// successful.
    pub fn join_timeout(self, duration: Duration) -> Result<R, Self> {
        let exec = self.exec;
        self.base
            .join_timeout(duration)
            .map_err(|base| Handle::new(base, exec))
    }
}

impl<P: Priority, R> Handle<P, R> {
    /// Update the priority of the associated task.
    ///
    /// This only has an effect if the task has not been started yet.
    pub fn set_priority(&self, priority: P) {
        // hold the queue lock so workers observe a consistent ordering
        let _queue = self.exec.lock();
        self.base.set_priority_value(priority.as_value());
    }

    /// The current priority of the associated task.
    pub fn priority(&self) -> P {
        P::from_value(self.base.priority_value()).expect("invalid priority value")
    }
}

impl<P, R> DropHandle<P, R> {
    fn new(base: task::DropHandle<R>, exec: Arc<ExecutorStruct>) -> Self {
        Self {
            base,
            exec,
            _marker: PhantomData,
        }
    }

    /// Check if the associated task has been completed.
    pub fn is_finished(&self) -> bool {
        self.base.is_finished()
    }

    /// Cancel the associated task. See [`Handle::cancel()`].
    pub fn cancel(self) -> Result<(), Self> {
        let exec = self.exec;

        match self.base.cancel() {
            Ok(()) => {
                exec.signal.notify_one();
                Ok(())
            }
            Err(base) => Err(DropHandle::new(base, exec)),
        }
    }

    /// Disarm this handle so that dropping it no longer cancels the task.
    pub fn detach(self) -> Handle<P, R> {
        Handle::new(self.base.detach(), self.exec)
    }

    /// Wait for the task to complete and return its result.
    ///
    /// # Panics
    ///
    /// This function will panic if the associated task function panicked.
    pub fn join(self) -> R {
        self.base.join()
    }

    /// Wait for the task to complete with a timeout and return its result if
    /// successful.
    pub fn join_timeout(self, duration: Duration) -> Result<R, Self> {
        let exec = self.exec;
        self.base
            .join_timeout(duration)
            .map_err(|base| DropHandle::new(base, exec))
    }
}

impl<P: Priority, R> DropHandle<P, R> {
    /// Update the priority of the associated task.
    ///
    /// This only has an effect if the task has not been started yet.
    pub fn set_priority(&self, priority: P) {
        let _queue = self.exec.lock();
        self.base.set_priority_value(priority.as_value());
    }

    /// The current priority of the associated task.
    pub fn priority(&self) -> P {
        P::from_value(self.base.priority_value()).expect("invalid priority value")
    }
}
