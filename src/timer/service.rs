use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::clock::Clock;
use super::record::TimerRecord;
use super::scheduler::{Scheduler, TaskHandle};
use crate::error::StoreError;
use crate::store::Store;

/// Invoked once when the exam time runs out.
pub type ExpiryHook = Arc<dyn Fn() + Send + Sync>;

/// Visual countdown driven by the timer.
pub trait CountdownDisplay: Send + Sync {
    /// Start (or restart) counting down from `remaining`.
    fn show(&self, remaining: Duration);
    fn hide(&self);
}

/// What [`TimerService::resume`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// An expiry was already pending in this process.
    AlreadyScheduled,
    /// Nothing persisted, nothing to resume.
    NoRecord,
    /// The deadline passed while the process was away; expiry ran.
    Expired,
    /// Expiry scheduled for the remaining time.
    Scheduled { remaining: Duration },
}

#[derive(Default)]
struct TimerSlot {
    pending: Option<TaskHandle>,
    // Bumped on every cancel; a scheduled callback carrying an older value is inert.
    generation: u64,
}

struct Shared {
    store: Store,
    display: Option<Arc<dyn CountdownDisplay>>,
    on_expire: ExpiryHook,
    slot: Mutex<TimerSlot>,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, TimerSlot> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn expire(&self, generation: Option<u64>) {
        {
            let mut slot = self.slot();
            if let Some(g) = generation
                && g != slot.generation
            {
                debug!(stale = g, current = slot.generation, "ignoring superseded timer callback");
                return;
            }
            slot.pending = None;
        }

        info!("exam time is up");
        if let Err(e) = TimerRecord::clear(&self.store) {
            warn!(error = %e, "failed to clear timer record on expiry");
        }
        if let Some(display) = &self.display {
            display.hide();
        }
        (self.on_expire)();
    }
}

/// Wall-clock exam timer that survives restarts.
pub struct TimerService {
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    shared: Arc<Shared>,
}

impl TimerService {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        on_expire: ExpiryHook,
    ) -> Self {
        Self::build(store, clock, scheduler, on_expire, None)
    }

    pub fn with_display(
        store: Store,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        on_expire: ExpiryHook,
        display: Arc<dyn CountdownDisplay>,
    ) -> Self {
        Self::build(store, clock, scheduler, on_expire, Some(display))
    }

    fn build(
        store: Store,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        on_expire: ExpiryHook,
        display: Option<Arc<dyn CountdownDisplay>>,
    ) -> Self {
        Self {
            clock,
            scheduler,
            shared: Arc::new(Shared {
                store,
                display,
                on_expire,
                slot: Mutex::new(TimerSlot::default()),
            }),
        }
    }

    /// Start a new timer, superseding any previous one.
    pub fn start(&self, duration_seconds: i64) -> Result<(), StoreError> {
        let mut slot = self.shared.slot();
        self.cancel_locked(&mut slot);

        let record = TimerRecord::new(self.clock.now(), duration_seconds);
        record.save(&self.shared.store)?;
        info!(duration_seconds, deadline = %record.deadline(), "exam timer started");

        if duration_seconds <= 0 {
            drop(slot);
            self.shared.expire(None);
            return Ok(());
        }

        let remaining = Duration::from_secs(duration_seconds as u64);
        self.schedule_locked(&mut slot, remaining);
        Ok(())
    }

    /// Recompute the remaining time from the persisted record.
    pub fn resume(&self) -> Result<ResumeOutcome, StoreError> {
        let mut slot = self.shared.slot();
        if slot.pending.is_some() {
            return Ok(ResumeOutcome::AlreadyScheduled);
        }

        let Some(record) = TimerRecord::load(&self.shared.store)? else {
            return Ok(ResumeOutcome::NoRecord);
        };

        match record.remaining_at(self.clock.now()) {
            None => {
                drop(slot);
                info!(deadline = %record.deadline(), "deadline passed while away");
                self.shared.expire(None);
                Ok(ResumeOutcome::Expired)
            }
            Some(remaining) => {
                self.schedule_locked(&mut slot, remaining);
                info!(remaining_secs = remaining.as_secs(), "exam timer resumed");
                Ok(ResumeOutcome::Scheduled { remaining })
            }
        }
    }

    /// Cancel any pending expiry and forget the persisted record.
    pub fn stop(&self) -> Result<(), StoreError> {
        {
            let mut slot = self.shared.slot();
            self.cancel_locked(&mut slot);
        }
        if let Some(display) = &self.shared.display {
            display.hide();
        }
        TimerRecord::clear(&self.shared.store)
    }

    /// Remaining time of the persisted timer, if any.
    pub fn remaining(&self) -> Result<Option<Duration>, StoreError> {
        Ok(TimerRecord::load(&self.shared.store)?.and_then(|r| r.remaining_at(self.clock.now())))
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.shared.slot().pending.is_some()
    }

    fn cancel_locked(&self, slot: &mut TimerSlot) {
        slot.generation += 1;
        if let Some(handle) = slot.pending.take() {
            self.scheduler.cancel(handle);
            debug!("cancelled pending exam timer");
        }
    }

    fn schedule_locked(&self, slot: &mut TimerSlot, remaining: Duration) {
        let shared = self.shared.clone();
        let generation = slot.generation;
        let handle = self
            .scheduler
            .schedule(remaining, Box::new(move || shared.expire(Some(generation))));
        slot.pending = Some(handle);

        if let Some(display) = &self.shared.display {
            display.show(remaining);
        }
    }
}
