use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use super::types::{
    Envelope, ExamSummary, HiringDrive, ProctoringUpload, ResultRecord, ResultSubmission,
    StartExamRequest,
};
use super::ResultsApi;
use crate::proctor::ProctorEvent;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5174/api";

pub struct ExamApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ExamApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Appends `segments` to the base path. Each segment is percent-encoded,
    /// so ids containing `/`, `?` or `#` stay a single segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The backend reports failures as {"message": "..."}.
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| if body.is_empty() { "unknown error".to_string() } else { body });
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn data<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let envelope = response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(envelope.data)
    }

    /// `GET /users/me/hiring-drives`
    pub async fn hiring_drives(&self) -> Result<Vec<HiringDrive>, ApiError> {
        let url = self.url(&["users", "me", "hiring-drives"])?;
        self.data(self.client.get(url)).await
    }

    /// `GET /users/me/hiring-drives-exam/{driveId}`
    pub async fn drive_exams(&self, drive_id: &str) -> Result<Vec<ExamSummary>, ApiError> {
        let url = self.url(&["users", "me", "hiring-drives-exam", drive_id])?;
        self.data(self.client.get(url)).await
    }

    /// `POST /results/me/start`
    pub async fn start_exam(&self, exam_id: &str, drive_id: &str) -> Result<(), ApiError> {
        let body = StartExamRequest {
            exam_id: exam_id.to_string(),
            drive_id: drive_id.to_string(),
        };
        let url = self.url(&["results", "me", "start"])?;
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

impl ResultsApi for ExamApiClient {
    async fn submit_result(&self, submission: &ResultSubmission) -> Result<String, ApiError> {
        let url = self.url(&["results", "me", "submit"])?;
        let record: ResultRecord = self.data(self.client.post(url).json(submission)).await?;
        debug!(result_id = %record.id, "result recorded");
        Ok(record.id)
    }

    async fn upload_proctoring(&self, result_id: &str, events: &[ProctorEvent]) -> Result<(), ApiError> {
        let body = ProctoringUpload { events };
        let url = self.url(&["results", result_id, "proctoring"])?;
        self.send(self.client.post(url).json(&body)).await?;
        debug!(result_id, events = events.len(), "proctoring uploaded");
        Ok(())
    }
}
