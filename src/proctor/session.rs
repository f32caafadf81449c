use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::event::{ProctorEvent, ProctorEventKind};
use crate::timer::Clock;

/// In-memory record of one exam attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct ExamSession {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub active: bool,
    pub events: Vec<ProctorEvent>,
}

/// Owner of the current [`ExamSession`].
///
/// [`record_event`](Self::record_event) is the single entry point for new
/// events and does nothing unless the session is active.
pub struct SessionLog {
    clock: Arc<dyn Clock>,
    session: Mutex<Option<ExamSession>>,
}

impl SessionLog {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            session: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ExamSession>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Begin a fresh session with an empty log, replacing any previous one.
    pub fn start(&self) -> Uuid {
        let session = ExamSession {
            id: Uuid::new_v4(),
            start_time: self.clock.now(),
            active: true,
            events: Vec::new(),
        };
        let id = session.id;
        *self.lock() = Some(session);
        info!(session = %id, "exam session started");
        id
    }

    /// Mark the session inactive. Returns `false` if it was not active.
    pub fn stop(&self) -> bool {
        let mut guard = self.lock();
        match guard.as_mut() {
            Some(session) if session.active => {
                session.active = false;
                info!(session = %session.id, events = session.events.len(), "exam session stopped");
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().as_ref().is_some_and(|s| s.active)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.lock().as_ref().map(|s| s.id)
    }

    /// Append an event stamped with the current time, if the session is active.
    pub fn record_event(&self, kind: ProctorEventKind) -> bool {
        let mut guard = self.lock();
        let Some(session) = guard.as_mut().filter(|s| s.active) else {
            debug!(kind = kind.tag(), "dropping event outside an active session");
            return false;
        };
        debug!(kind = kind.tag(), "proctor event");
        session.events.push(ProctorEvent::new(kind, self.clock.now()));
        true
    }

    /// Copy of the events recorded so far.
    #[cfg(test)]
    pub fn events(&self) -> Vec<ProctorEvent> {
        self.lock().as_ref().map(|s| s.events.clone()).unwrap_or_default()
    }

    /// Stop the session and move its log out, discarding the session.
    pub fn finish(&self) -> Vec<ProctorEvent> {
        self.stop();
        self.lock().take().map(|s| s.events).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::SystemClock;

    fn log() -> SessionLog {
        SessionLog::new(Arc::new(SystemClock))
    }

    #[test]
    fn inactive_log_never_grows() {
        let log = log();
        assert!(!log.record_event(ProctorEventKind::Paste));
        assert!(log.events().is_empty());

        log.start();
        log.stop();
        let before = log.events().len();
        assert!(!log.record_event(ProctorEventKind::FocusGained));
        assert_eq!(log.events().len(), before);
    }

    #[test]
    fn events_after_stop_are_dropped() {
        let log = log();
        log.start();
        log.record_event(ProctorEventKind::FocusLost);
        log.record_event(ProctorEventKind::Paste);
        log.stop();
        log.record_event(ProctorEventKind::FocusGained);

        let kinds: Vec<_> = log.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ProctorEventKind::FocusLost, ProctorEventKind::Paste]);
    }

    #[test]
    fn start_resets_the_log() {
        let log = log();
        let first = log.start();
        log.record_event(ProctorEventKind::Paste);

        let second = log.start();
        assert_ne!(first, second);
        assert!(log.events().is_empty());
        assert!(log.is_active());
    }

    #[test]
    fn finish_hands_off_and_discards() {
        let log = log();
        log.start();
        log.record_event(ProctorEventKind::FocusLost);

        let events = log.finish();
        assert_eq!(events.len(), 1);
        assert!(!log.is_active());
        assert_eq!(log.id(), None);
        assert!(log.finish().is_empty());
    }

    #[test]
    fn stop_without_session_is_harmless() {
        assert!(!log().stop());
    }
}
