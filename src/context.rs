use std::sync::Arc;

use tracing::{info, warn};

use crate::error::StateError;
use crate::proctor::{ProctorEvent, ProctorRecorder, RecorderConfig, SessionLog, SignalBus};
use crate::state_machine::{SessionState, StateMachine};
use crate::store::Store;
use crate::timer::{Clock, CountdownDisplay, ExpiryHook, ResumeOutcome, Scheduler, TimerService};

/// What [`ExamContext::restore`] found after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// No exam in progress.
    Idle(SessionState),
    /// Proctoring restarted and the timer resumed.
    Exam(ResumeOutcome),
    /// The process died mid-submission; the pipeline has to finish it.
    InterruptedSubmission,
}

/// Long-lived state of one exam client, owned by the process root and
/// shared with every component that needs it.
pub struct ExamContext {
    pub store: Store,
    pub clock: Arc<dyn Clock>,
    pub state: StateMachine,
    pub timer: TimerService,
    pub session: Arc<SessionLog>,
    pub signals: Arc<SignalBus>,
    pub recorder: ProctorRecorder,
}

impl ExamContext {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        on_expire: ExpiryHook,
        display: Option<Arc<dyn CountdownDisplay>>,
        recorder_config: RecorderConfig,
    ) -> Self {
        let timer = match display {
            Some(display) => TimerService::with_display(store.clone(), clock.clone(), scheduler, on_expire, display),
            None => TimerService::new(store.clone(), clock.clone(), scheduler, on_expire),
        };
        let session = Arc::new(SessionLog::new(clock.clone()));
        let signals = Arc::new(SignalBus::new());
        let recorder = ProctorRecorder::new(session.clone(), signals.clone(), recorder_config);

        Self {
            state: StateMachine::new(store.clone()),
            store,
            clock,
            timer,
            session,
            signals,
            recorder,
        }
    }

    /// Enter `ExamStarted` and start session, proctoring and timer, once each.
    pub fn begin_exam<'a>(
        &self,
        duration_seconds: i64,
        open_documents: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), StateError> {
        self.state.transition(SessionState::ExamStarted)?;
        self.session.start();
        self.recorder.start(open_documents);
        self.timer.start(duration_seconds)?;
        Ok(())
    }

    /// Pick up where a previous process left off.
    ///
    /// The in-memory event log did not survive, so a fresh session is started.
    pub fn restore<'a>(
        &self,
        open_documents: impl IntoIterator<Item = &'a str>,
    ) -> Result<Restored, StateError> {
        match self.state.current() {
            SessionState::ExamStarted => {
                if !self.session.is_active() {
                    self.session.start();
                }
                self.recorder.start(open_documents);
                let outcome = self.timer.resume()?;
                info!(?outcome, "exam restored");
                Ok(Restored::Exam(outcome))
            }
            SessionState::Submitting => {
                warn!("previous submission was interrupted");
                Ok(Restored::InterruptedSubmission)
            }
            other => Ok(Restored::Idle(other)),
        }
    }

    /// Freeze the exam: stop the timer, the session and proctoring, and hand
    /// over the event log. Nothing can be appended to it afterwards.
    pub fn halt(&self) -> Vec<ProctorEvent> {
        if let Err(e) = self.timer.stop() {
            warn!(error = %e, "failed to clear timer record");
        }
        self.session.stop();
        self.recorder.stop();
        self.session.finish()
    }

    /// The backend rejected our token.
    pub fn handle_unauthorized(&self) {
        match self.state.transition_unless_submitting(SessionState::LoggedOut) {
            Ok(true) => {
                warn!("session expired, logged out");
                if let Err(e) = self.timer.stop() {
                    warn!(error = %e, "failed to stop countdown");
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "failed to record logout after 401"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::timer::{FixedClock, ManualScheduler};
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    pub struct ContextRig {
        pub ctx: Arc<ExamContext>,
        pub clock: Arc<FixedClock>,
        pub scheduler: Arc<ManualScheduler>,
        pub expiries: Arc<AtomicUsize>,
    }

    impl ContextRig {
        pub fn expiries(&self) -> usize {
            self.expiries.load(Ordering::SeqCst)
        }
    }

    pub fn context_rig(store: Store) -> ContextRig {
        let clock = Arc::new(FixedClock::at(t0()));
        let scheduler = Arc::new(ManualScheduler::new());
        let expiries = Arc::new(AtomicUsize::new(0));
        let e = expiries.clone();
        let ctx = Arc::new(ExamContext::new(
            store,
            clock.clone(),
            scheduler.clone(),
            Arc::new(move || {
                e.fetch_add(1, Ordering::SeqCst);
            }),
            None,
            RecorderConfig::default(),
        ));
        ContextRig {
            ctx,
            clock,
            scheduler,
            expiries,
        }
    }
}
