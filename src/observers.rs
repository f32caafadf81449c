use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

/// Opaque handle returned by [`ObserverSet::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

type Callback<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// Ordered list of callbacks notified synchronously, in subscription order.
///
/// Callbacks are cloned out of the lock before being called, so an observer
/// may subscribe or unsubscribe from inside its own callback. A failing
/// observer is logged and does not stop the remaining ones.
pub struct ObserverSet<T> {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverHandle, Callback<T>)>>,
}

impl<T> Default for ObserverSet<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: Mutex::new(Vec::new()),
        }
    }
}

impl<T> ObserverSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ObserverHandle, Callback<T>)>> {
        match self.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> ObserverHandle
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handle = ObserverHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((handle, Arc::new(callback)));
        handle
    }

    /// Returns `false` when the handle was not (or no longer) registered.
    pub fn unsubscribe(&self, handle: ObserverHandle) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(h, _)| *h != handle);
        observers.len() != before
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Notifies every observer and returns how many reported an error.
    pub fn notify(&self, value: &T) -> usize {
        let snapshot: Vec<(ObserverHandle, Callback<T>)> = self.lock().clone();

        let mut failures = 0;
        for (handle, callback) in snapshot {
            if let Err(e) = callback(value) {
                failures += 1;
                warn!(observer = handle.0, error = %e, "observer failed");
            }
        }
        failures
    }
}
