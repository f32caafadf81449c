pub mod client;
pub mod error;
pub mod types;

pub use client::{DEFAULT_BASE_URL, ExamApiClient};
pub use error::ApiError;
pub use types::{ExamSummary, HiringDrive, ResultSubmission};

use crate::proctor::ProctorEvent;

/// The two backend calls the submission pipeline depends on.
pub trait ResultsApi {
    /// Record a result and return the server's identifier for it.
    async fn submit_result(&self, submission: &ResultSubmission) -> Result<String, ApiError>;

    /// Attach the proctoring log to a recorded result.
    async fn upload_proctoring(&self, result_id: &str, events: &[ProctorEvent]) -> Result<(), ApiError>;
}
