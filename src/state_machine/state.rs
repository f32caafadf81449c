use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StateError;
use crate::observers::{ObserverHandle, ObserverSet};
use crate::store::{Store, keys};

/// The lifecycle states of an exam attempt.
///
/// LOGGED_OUT → LOGGED_IN → EXAM_STARTED → SUBMITTING → EXAM_SUBMITTED
///
/// `ExamSubmitted` and `ExamExpired` are terminal: only a new login leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
    ExamStarted,
    Submitting,
    ExamSubmitted,
    ExamExpired,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::ExamSubmitted | SessionState::ExamExpired)
    }

    /// States in which a new submission must not begin.
    pub fn blocks_submission(self) -> bool {
        self == SessionState::Submitting || self.is_terminal()
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::LoggedOut => write!(f, "LOGGED_OUT"),
            SessionState::LoggedIn => write!(f, "LOGGED_IN"),
            SessionState::ExamStarted => write!(f, "EXAM_STARTED"),
            SessionState::Submitting => write!(f, "SUBMITTING"),
            SessionState::ExamSubmitted => write!(f, "EXAM_SUBMITTED"),
            SessionState::ExamExpired => write!(f, "EXAM_EXPIRED"),
        }
    }
}

/// Holds the current [`SessionState`], persists every change and notifies
/// observers afterwards.
///
/// `transition` is the only writer of the persisted `examState` key.
pub struct StateMachine {
    store: Store,
    current: Mutex<Option<SessionState>>,
    observers: ObserverSet<SessionState>,
}

impl StateMachine {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            current: Mutex::new(None),
            observers: ObserverSet::new(),
        }
    }

    /// The last applied state. Falls back to the persisted value on a cold
    /// start, then to `LoggedOut`.
    pub fn current(&self) -> SessionState {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(state) = *current {
            return state;
        }
        let persisted = self
            .store
            .get::<SessionState>(keys::EXAM_STATE)
            .ok()
            .flatten()
            .unwrap_or(SessionState::LoggedOut);
        *current = Some(persisted);
        persisted
    }

    /// Persist `next` and notify observers in subscription order.
    ///
    /// Leaving a terminal state is only allowed towards `LoggedIn`.
    pub fn transition(&self, next: SessionState) -> Result<(), StateError> {
        self.apply(|from| {
            if from.is_terminal() && next != from && next != SessionState::LoggedIn {
                return Err(StateError::TerminalState { from, to: next });
            }
            Ok(Some(next))
        })
        .map(|_| ())
    }

    /// Atomically move to `Submitting` unless a submission is already running
    /// or finished. Returns `false` without writing anything in that case.
    pub fn begin_submission(&self) -> Result<bool, StateError> {
        self.apply(|from| {
            if from.blocks_submission() {
                Ok(None)
            } else {
                Ok(Some(SessionState::Submitting))
            }
        })
    }

    /// Like [`transition`](Self::transition) but a no-op while a submission
    /// runs or after it finished. Used by best-effort callers such as the
    /// 401 handler.
    pub fn transition_unless_submitting(&self, next: SessionState) -> Result<bool, StateError> {
        self.apply(|from| {
            if from.blocks_submission() {
                Ok(None)
            } else {
                Ok(Some(next))
            }
        })
    }

    /// Move out of `Submitting` no matter what: the in-memory state and the
    /// observers are updated even when persisting fails, and the persistence
    /// error is returned afterwards.
    pub fn settle(&self, next: SessionState) -> Result<(), StateError> {
        let persisted = {
            let mut current = match self.current.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let from = current.unwrap_or(SessionState::Submitting);
            let persisted = self.store.set(keys::EXAM_STATE, &next);
            *current = Some(next);
            info!(%from, to = %next, "state settled");
            persisted
        };

        self.observers.notify(&next);
        persisted.map_err(StateError::from)
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn(&SessionState) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, handle: ObserverHandle) -> bool {
        self.observers.unsubscribe(handle)
    }

    // Decide, persist and cache under one lock; notify after releasing it.
    fn apply<F>(&self, decide: F) -> Result<bool, StateError>
    where
        F: FnOnce(SessionState) -> Result<Option<SessionState>, StateError>,
    {
        let from = self.current();
        let next = {
            let mut current = match self.current.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let from = current.unwrap_or(from);
            let Some(next) = decide(from)? else {
                return Ok(false);
            };
            self.store.set(keys::EXAM_STATE, &next)?;
            *current = Some(next);
            info!(%from, to = %next, "state transition");
            next
        };

        self.observers.notify(&next);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn machine() -> (Store, StateMachine) {
        let store = Store::in_memory();
        (store.clone(), StateMachine::new(store))
    }

    #[test]
    fn cold_start_defaults_to_logged_out() {
        let (_, sm) = machine();
        assert_eq!(sm.current(), SessionState::LoggedOut);
    }

    #[test]
    fn cold_start_reads_persisted_state() {
        let store = Store::in_memory();
        store.set(keys::EXAM_STATE, &SessionState::ExamStarted).unwrap();

        let sm = StateMachine::new(store);
        assert_eq!(sm.current(), SessionState::ExamStarted);
    }

    #[test]
    fn transition_persists_before_notifying() {
        let (store, sm) = machine();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (s, st) = (seen.clone(), store.clone());
        sm.subscribe(move |state| {
            let persisted = st.get::<SessionState>(keys::EXAM_STATE)?;
            s.lock().unwrap().push((*state, persisted));
            Ok(())
        });

        sm.transition(SessionState::LoggedIn).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(SessionState::LoggedIn, Some(SessionState::LoggedIn))]
        );
        assert_eq!(sm.current(), SessionState::LoggedIn);
    }

    #[test]
    fn terminal_state_rejects_silent_revert() {
        let (_, sm) = machine();
        sm.transition(SessionState::ExamStarted).unwrap();
        sm.transition(SessionState::ExamSubmitted).unwrap();

        let err = sm.transition(SessionState::ExamStarted).unwrap_err();
        assert!(matches!(err, StateError::TerminalState { .. }));
        assert!(sm.transition(SessionState::LoggedOut).is_err());
        assert_eq!(sm.current(), SessionState::ExamSubmitted);

        // A new login is the way out.
        sm.transition(SessionState::LoggedIn).unwrap();
        assert_eq!(sm.current(), SessionState::LoggedIn);
    }

    #[test]
    fn begin_submission_only_once() {
        let (_, sm) = machine();
        sm.transition(SessionState::ExamStarted).unwrap();

        assert!(sm.begin_submission().unwrap());
        assert_eq!(sm.current(), SessionState::Submitting);
        assert!(!sm.begin_submission().unwrap());

        sm.transition(SessionState::ExamSubmitted).unwrap();
        assert!(!sm.begin_submission().unwrap());
    }

    #[test]
    fn refused_begin_does_not_notify() {
        let (_, sm) = machine();
        sm.transition(SessionState::Submitting).unwrap();

        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        sm.subscribe(move |_| {
            *h.lock().unwrap() += 1;
            Ok(())
        });

        assert!(!sm.begin_submission().unwrap());
        assert_eq!(*hits.lock().unwrap(), 0);
    }

    #[test]
    fn unless_submitting_skips_locked_states() {
        let (_, sm) = machine();
        sm.transition(SessionState::Submitting).unwrap();
        assert!(!sm.transition_unless_submitting(SessionState::LoggedOut).unwrap());
        assert_eq!(sm.current(), SessionState::Submitting);

        sm.transition(SessionState::ExamExpired).unwrap();
        assert!(!sm.transition_unless_submitting(SessionState::LoggedOut).unwrap());
        assert_eq!(sm.current(), SessionState::ExamExpired);
    }

    #[test]
    fn settle_updates_memory_and_observers() {
        let (store, sm) = machine();
        sm.transition(SessionState::Submitting).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        sm.subscribe(move |state| {
            s.lock().unwrap().push(*state);
            Ok(())
        });

        sm.settle(SessionState::LoggedOut).unwrap();
        assert_eq!(sm.current(), SessionState::LoggedOut);
        assert_eq!(
            store.get::<SessionState>(keys::EXAM_STATE).unwrap(),
            Some(SessionState::LoggedOut)
        );
        assert_eq!(*seen.lock().unwrap(), vec![SessionState::LoggedOut]);
    }

    #[test]
    fn unsubscribed_observer_is_not_called() {
        let (_, sm) = machine();
        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        let handle = sm.subscribe(move |_| {
            *h.lock().unwrap() += 1;
            Ok(())
        });

        sm.transition(SessionState::LoggedIn).unwrap();
        assert!(sm.unsubscribe(handle));
        sm.transition(SessionState::ExamStarted).unwrap();
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn state_serializes_as_camel_case() {
        let json = serde_json::to_string(&SessionState::ExamStarted).unwrap();
        assert_eq!(json, r#""examStarted""#);
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::LoggedOut.to_string(), "LOGGED_OUT");
        assert_eq!(SessionState::Submitting.to_string(), "SUBMITTING");
        assert_eq!(SessionState::ExamExpired.to_string(), "EXAM_EXPIRED");
    }
}
