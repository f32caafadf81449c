use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Handle to a scheduled one-shot task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cancellable one-shot scheduling, independent of any event loop.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;

    /// Returns `true` if the task was still pending.
    fn cancel(&self, handle: TaskHandle) -> bool;
}

/// Runs each task on the tokio runtime after a `sleep`; cancel aborts it.
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Binds to the runtime the caller is running on.
    #[cfg(test)]
    pub fn from_current() -> Result<Self, tokio::runtime::TryCurrentError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tasks = self.tasks.clone();

        // Insert while holding the lock so a zero-delay task cannot remove
        // itself before it was registered.
        let mut registry = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut registry) = tasks.lock() {
                registry.remove(&id);
            }
            task();
        });
        registry.insert(id, join);
        TaskHandle(id)
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        let join = match self.tasks.lock() {
            Ok(mut registry) => registry.remove(&handle.0),
            Err(_) => None,
        };
        match join {
            Some(join) => {
                join.abort();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
pub use manual::ManualScheduler;
