use crate::error::SubmitMode;
use crate::state_machine::SessionState;

/// How a submission attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Primary path completed.
    Submitted { result_id: String },
    /// Primary path failed; a zero score and the event log were recorded.
    SubmittedViaFallback { result_id: String, cause: String },
    /// Nothing to package. No network call was made.
    Aborted { reason: String },
    /// Both paths failed. `result_id` is set when the fallback result was
    /// recorded but its upload failed.
    Failed {
        primary: String,
        fallback: String,
        result_id: Option<String>,
    },
    /// Another submission was already running or done.
    Skipped,
}

impl SubmissionOutcome {
    pub fn result_id(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Submitted { result_id }
            | SubmissionOutcome::SubmittedViaFallback { result_id, .. } => Some(result_id),
            SubmissionOutcome::Failed { result_id, .. } => result_id.as_deref(),
            SubmissionOutcome::Aborted { .. } | SubmissionOutcome::Skipped => None,
        }
    }

    /// Where the machine ends after cleanup. `None` for `Skipped`, which must
    /// not touch state.
    pub fn final_state(&self) -> Option<SessionState> {
        match self {
            SubmissionOutcome::Skipped => None,
            other if other.result_id().is_some() => Some(SessionState::ExamSubmitted),
            _ => Some(SessionState::LoggedOut),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SubmissionOutcome::SubmittedViaFallback { .. }
                | SubmissionOutcome::Aborted { .. }
                | SubmissionOutcome::Failed { .. }
        )
    }

    /// The message shown to the candidate.
    pub fn user_message(&self, mode: SubmitMode) -> Option<String> {
        match self {
            SubmissionOutcome::Submitted { .. } => Some(match mode {
                SubmitMode::Automatic => "Exam auto-submitted".to_string(),
                SubmitMode::Manual => "Exam submitted successfully".to_string(),
            }),
            SubmissionOutcome::SubmittedViaFallback { .. } => {
                Some("Submission failed due to an unexpected error.".to_string())
            }
            SubmissionOutcome::Aborted { reason } => Some(format!("Submission failed: {reason}")),
            SubmissionOutcome::Failed { fallback, .. } => {
                Some(format!("Submission failed: {fallback}"))
            }
            SubmissionOutcome::Skipped => None,
        }
    }
}
