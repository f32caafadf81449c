use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use super::event::ProctorEventKind;
use super::fingerprint::KnownCode;
use super::session::SessionLog;
use super::signals::{DocumentChange, EditorSignal, SignalBus};
use crate::observers::ObserverHandle;

/// Classification thresholds, in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderConfig {
    /// A region must insert more than this to count towards a paste.
    pub paste_min_len: usize,
    /// A region must insert more than this to be reported as a large insert.
    pub large_insert_min_len: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            paste_min_len: 1,
            large_insert_min_len: 50,
        }
    }
}

/// A paste replaces every selection at once: some region inserts more than
/// one character and there are as many regions as selections.
pub fn classify_paste(change: &DocumentChange, config: &RecorderConfig) -> Option<ProctorEventKind> {
    let is_paste = change.changes.len() == change.selections
        && change
            .changes
            .iter()
            .any(|c| c.inserted_len() > config.paste_min_len);
    is_paste.then_some(ProctorEventKind::Paste)
}

/// One `LargeInsert` per region over the threshold. Novel text is added to
/// `known`, so the same block is only ever reported as new once.
pub fn classify_large_inserts(
    change: &DocumentChange,
    config: &RecorderConfig,
    known: &mut KnownCode,
) -> Vec<ProctorEventKind> {
    change
        .changes
        .iter()
        .filter(|c| c.inserted_len() > config.large_insert_min_len)
        .map(|c| ProctorEventKind::LargeInsert {
            len: c.inserted_len(),
            new_code: known.observe(&c.text),
        })
        .collect()
}

pub fn classify_focus(focused: bool) -> ProctorEventKind {
    if focused {
        ProctorEventKind::FocusGained
    } else {
        ProctorEventKind::FocusLost
    }
}

#[derive(Default)]
struct RecorderState {
    known: KnownCode,
    subscription: Option<ObserverHandle>,
}

/// Watches editor signals while running and feeds classified events into
/// the session log.
pub struct ProctorRecorder {
    session: Arc<SessionLog>,
    bus: Arc<SignalBus>,
    config: RecorderConfig,
    state: Arc<Mutex<RecorderState>>,
}

impl ProctorRecorder {
    pub fn new(session: Arc<SessionLog>, bus: Arc<SignalBus>, config: RecorderConfig) -> Self {
        Self {
            session,
            bus,
            config,
            state: Arc::new(Mutex::new(RecorderState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        lock_state(&self.state)
    }

    /// Snapshot the open documents and start listening.
    ///
    /// Returns `false` (and changes nothing) when already running.
    pub fn start<'a>(&self, open_documents: impl IntoIterator<Item = &'a str>) -> bool {
        let mut state = self.lock();
        if state.subscription.is_some() {
            debug!("proctoring already running");
            return false;
        }

        state.known.clear();
        state.known.seed(open_documents);

        let session = self.session.clone();
        let shared = self.state.clone();
        let config = self.config;
        let handle = self.bus.subscribe(move |signal| {
            for kind in classify_signal(signal, &config, &shared) {
                session.record_event(kind);
            }
            Ok(())
        });
        state.subscription = Some(handle);

        info!(known = state.known.len(), "proctoring started");
        true
    }

    /// Stop listening and forget the snapshot. Safe when not running.
    pub fn stop(&self) {
        let mut state = self.lock();
        if let Some(handle) = state.subscription.take() {
            self.bus.unsubscribe(handle);
            info!("proctoring stopped");
        }
        state.known.clear();
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.lock().subscription.is_some()
    }
}

fn lock_state(state: &Mutex<RecorderState>) -> MutexGuard<'_, RecorderState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn classify_signal(
    signal: &EditorSignal,
    config: &RecorderConfig,
    state: &Mutex<RecorderState>,
) -> Vec<ProctorEventKind> {
    match signal {
        EditorSignal::FocusChanged { focused } => vec![classify_focus(*focused)],
        EditorSignal::DocumentChanged(change) => {
            if !change.in_active_editor {
                return Vec::new();
            }
            let mut kinds: Vec<_> = classify_paste(change, config).into_iter().collect();
            let mut state = lock_state(state);
            kinds.extend(classify_large_inserts(change, config, &mut state.known));
            kinds
        }
    }
}
