use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::outcome::SubmissionOutcome;
use super::packager::Packager;
use super::score::{Score, ScorePolicy};
use crate::api::{ResultSubmission, ResultsApi};
use crate::context::ExamContext;
use crate::error::{SubmitError, SubmitMode};
use crate::git::GitLogSource;
use crate::proctor::{ProctorEvent, ProctorEventKind};
use crate::state_machine::SessionState;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Only workspaces under this directory are deleted on cleanup.
    pub workspace_root: PathBuf,
    /// Local copy of every artifact and event log, when set.
    pub archive_dir: Option<PathBuf>,
}

/// The exam being submitted, read from the store once.
struct Target {
    exam_id: String,
    drive_id: String,
    workspace: PathBuf,
}

impl Target {
    fn submission(&self, score: Score) -> ResultSubmission {
        ResultSubmission {
            exam_id: self.exam_id.clone(),
            drive_id: self.drive_id.clone(),
            is_passed: score.is_passed,
            score: score.score,
        }
    }
}

/// Runs a submission end to end: freeze, package, submit with a degraded
/// fallback, then clean up whatever happened.
pub struct SubmissionPipeline<A, P, G, S> {
    ctx: Arc<ExamContext>,
    api: A,
    packager: P,
    git: G,
    score: S,
    settings: PipelineSettings,
}

impl<A, P, G, S> SubmissionPipeline<A, P, G, S>
where
    A: ResultsApi,
    P: Packager,
    G: GitLogSource,
    S: ScorePolicy,
{
    pub fn new(
        ctx: Arc<ExamContext>,
        api: A,
        packager: P,
        git: G,
        score: S,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            ctx,
            api,
            packager,
            git,
            score,
            settings,
        }
    }

    /// Submit the current exam. Concurrent or repeated calls after the first
    /// return [`SubmissionOutcome::Skipped`] without side effects.
    pub async fn submit(&self, mode: SubmitMode) -> SubmissionOutcome {
        match self.ctx.state.begin_submission() {
            Ok(true) => {}
            Ok(false) => {
                info!(%mode, state = %self.ctx.state.current(), "submission skipped");
                return SubmissionOutcome::Skipped;
            }
            Err(e) => {
                error!(error = %e, "could not enter submitting state");
                return SubmissionOutcome::Aborted {
                    reason: e.to_string(),
                };
            }
        }
        self.run(mode).await
    }

    /// Finish a submission a previous process left in `Submitting`.
    /// Returns `None` when there is nothing to finish.
    pub async fn resume_interrupted(&self) -> Option<SubmissionOutcome> {
        if self.ctx.state.current() != SessionState::Submitting {
            return None;
        }
        Some(self.run(SubmitMode::Automatic).await)
    }

    async fn run(&self, mode: SubmitMode) -> SubmissionOutcome {
        info!(%mode, session = ?self.ctx.session.id(), "submitting exam");
        let mut events = self.ctx.halt();
        debug!(events = events.len(), "event log frozen");

        let workspace = self.ctx.store.workspace().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read workspace path");
            None
        });

        let (outcome, artifact) = match self.prepare(workspace.as_deref()) {
            Ok((target, artifact)) => {
                let outcome = self.deliver(&target, &artifact, &mut events).await;
                (outcome, Some(artifact))
            }
            Err(e) => {
                error!(error = %e, "submission aborted");
                (
                    SubmissionOutcome::Aborted {
                        reason: e.to_string(),
                    },
                    None,
                )
            }
        };

        self.cleanup(artifact.as_deref(), workspace.as_deref(), &outcome);
        info!(%mode, ?outcome, "submission finished");
        outcome
    }

    fn prepare(&self, workspace: Option<&Path>) -> Result<(Target, PathBuf), SubmitError> {
        let workspace = workspace
            .ok_or_else(|| SubmitError::Setup("no exam workspace recorded".to_string()))?;
        let exam_id = self
            .ctx
            .store
            .exam_id()
            .ok()
            .flatten()
            .ok_or_else(|| SubmitError::Setup("no exam in progress".to_string()))?;
        let drive_id = self
            .ctx
            .store
            .drive_id()
            .ok()
            .flatten()
            .ok_or_else(|| SubmitError::Setup("no hiring drive recorded".to_string()))?;

        let artifact = self
            .packager
            .package(workspace)
            .map_err(|e| SubmitError::Setup(format!("packaging failed: {e}")))?
            .ok_or_else(|| SubmitError::Setup("'src' folder not found in workspace".to_string()))?;

        Ok((
            Target {
                exam_id,
                drive_id,
                workspace: workspace.to_path_buf(),
            },
            artifact,
        ))
    }

    async fn deliver(
        &self,
        target: &Target,
        artifact: &Path,
        events: &mut Vec<ProctorEvent>,
    ) -> SubmissionOutcome {
        let git_logs = self.git.collect(&target.workspace);
        events.push(ProctorEvent::new(
            ProctorEventKind::GitLogs { git_logs },
            self.ctx.clock.now(),
        ));

        let primary = match self.primary(target, artifact, events).await {
            Ok(result_id) => return SubmissionOutcome::Submitted { result_id },
            Err(e) => e,
        };
        warn!(error = %primary, "primary submission failed, recording fallback result");

        match self.fallback(target, events).await {
            Ok(result_id) => SubmissionOutcome::SubmittedViaFallback {
                result_id,
                cause: primary.to_string(),
            },
            Err((fallback, result_id)) => {
                error!(error = %fallback, "fallback submission failed");
                SubmissionOutcome::Failed {
                    primary: primary.to_string(),
                    fallback: fallback.to_string(),
                    result_id,
                }
            }
        }
    }

    async fn primary(
        &self,
        target: &Target,
        artifact: &Path,
        events: &[ProctorEvent],
    ) -> Result<String, SubmitError> {
        let score = self.score.evaluate(&target.workspace).await?;
        self.checkpoint("score");

        if let Some(dir) = &self.settings.archive_dir {
            self.archive(dir, artifact, events)?;
        }

        let result_id = self.api.submit_result(&target.submission(score)).await?;
        self.checkpoint("submit");
        self.api.upload_proctoring(&result_id, events).await?;
        Ok(result_id)
    }

    async fn fallback(
        &self,
        target: &Target,
        events: &[ProctorEvent],
    ) -> Result<String, (SubmitError, Option<String>)> {
        let result_id = self
            .api
            .submit_result(&target.submission(Score::FAILED))
            .await
            .map_err(|e| (SubmitError::from(e), None))?;
        self.checkpoint("fallback submit");
        self.api
            .upload_proctoring(&result_id, events)
            .await
            .map_err(|e| (SubmitError::from(e), Some(result_id.clone())))?;
        Ok(result_id)
    }

    fn archive(&self, dir: &Path, artifact: &Path, events: &[ProctorEvent]) -> Result<(), SubmitError> {
        fs::create_dir_all(dir)?;
        let name = artifact
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "submission.json".into());
        let artifact_copy = dir.join(name);
        fs::copy(artifact, &artifact_copy)?;

        let events_path = dir.join(format!("events-{}.json", self.ctx.clock.now().timestamp_millis()));
        let json = serde_json::to_vec_pretty(events).map_err(io::Error::from)?;
        fs::write(&events_path, json)?;

        info!(
            artifact = %artifact_copy.display(),
            events = %events_path.display(),
            "submission archived locally"
        );
        Ok(())
    }

    // Nothing else may move the machine while it is `Submitting`.
    fn checkpoint(&self, step: &str) {
        let state = self.ctx.state.current();
        if state != SessionState::Submitting {
            warn!(step, %state, "state changed during submission");
        }
    }

    fn cleanup(&self, artifact: Option<&Path>, workspace: Option<&Path>, outcome: &SubmissionOutcome) {
        if let Some(artifact) = artifact
            && let Err(e) = fs::remove_file(artifact)
        {
            warn!(path = %artifact.display(), error = %e, "failed to delete artifact");
        }

        if let Some(workspace) = workspace {
            self.discard_workspace(workspace);
        }

        if let Err(e) = self.ctx.store.clear_identity() {
            warn!(error = %e, "failed to clear exam identity");
        }

        if let Some(state) = outcome.final_state()
            && let Err(e) = self.ctx.state.settle(state)
        {
            warn!(error = %e, "failed to persist final state");
        }
    }

    fn discard_workspace(&self, workspace: &Path) {
        if !workspace.starts_with(&self.settings.workspace_root) {
            info!(path = %workspace.display(), "workspace is not managed by us, leaving it in place");
            return;
        }
        match fs::remove_dir_all(workspace) {
            Ok(()) => debug!(path = %workspace.display(), "workspace removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %workspace.display(), error = %e, "failed to remove workspace"),
        }
    }
}
