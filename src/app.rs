//! Composition root: builds the [`ExamContext`] and runs the commands the CLI
//! exposes on top of it.

use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ExamApiClient, ExamSummary, HiringDrive};
use crate::config::ExamConfig;
use crate::context::{ExamContext, Restored};
use crate::error::SubmitMode;
use crate::git::GitLogCollector;
use crate::observers::ObserverHandle;
use crate::proctor::EditorSignal;
use crate::state_machine::SessionState;
use crate::store::{FileStore, Store};
use crate::submission::{
    ConfiguredScore, PipelineSettings, SourceBundler, SourceFile, SubmissionOutcome,
    SubmissionPipeline, source_files,
};
use crate::timer::{Clock, CountdownDisplay, Scheduler, SystemClock, TokioScheduler};
use crate::ui::{CountdownBar, attach_status_indicator};

pub type ClientPipeline =
    SubmissionPipeline<ExamApiClient, SourceBundler, GitLogCollector, ConfiguredScore>;

/// A line sent by the editor host on stdin.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HostLine {
    Command { command: HostCommand },
    Signal(EditorSignal),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum HostCommand {
    Submit,
}

/// Why [`App::watch`] returned.
#[derive(Debug)]
pub enum WatchExit {
    Submitted {
        mode: SubmitMode,
        outcome: SubmissionOutcome,
    },
    /// Shut down before any submission; the exam stays in progress.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub state: SessionState,
    pub exam_id: Option<String>,
    pub remaining: Option<Duration>,
}

pub struct App {
    config: ExamConfig,
    ctx: Arc<ExamContext>,
    triggers: mpsc::UnboundedReceiver<SubmitMode>,
    status_indicator: Option<ObserverHandle>,
}

impl App {
    /// Production wiring: file store, tokio timers, terminal countdown.
    pub fn new(config: ExamConfig, runtime: Handle) -> Result<Self> {
        let backend = FileStore::open(&config.store_path)
            .with_context(|| format!("Failed to open state file {}", config.store_path.display()))?;
        let display: Arc<dyn CountdownDisplay> = Arc::new(CountdownBar::new(runtime.clone()));
        let app = Self::assemble(
            config,
            Store::new(Arc::new(backend)),
            Arc::new(SystemClock),
            Arc::new(TokioScheduler::new(runtime)),
            Some(display),
        );
        Ok(app.with_status_indicator())
    }

    pub fn assemble(
        config: ExamConfig,
        store: Store,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        display: Option<Arc<dyn CountdownDisplay>>,
    ) -> Self {
        let (tx, triggers) = mpsc::unbounded_channel();
        let on_expire = Arc::new(move || {
            if tx.send(SubmitMode::Automatic).is_err() {
                warn!("exam expired but nobody is listening for submissions");
            }
        });
        let ctx = Arc::new(ExamContext::new(
            store,
            clock,
            scheduler,
            on_expire,
            display,
            config.recorder(),
        ));
        Self {
            config,
            ctx,
            triggers,
            status_indicator: None,
        }
    }

    /// Prints the state after every transition until the app is dropped.
    pub fn with_status_indicator(mut self) -> Self {
        if self.status_indicator.is_none() {
            self.status_indicator = Some(attach_status_indicator(&self.ctx.state));
        }
        self
    }

    fn client(&self) -> Result<ExamApiClient> {
        let token = self.ctx.store.token()?;
        ExamApiClient::new(&self.config.api_base_url, token, self.config.request_timeout())
            .context("Failed to build HTTP client")
    }

    // A 401 anywhere logs the candidate out.
    fn checked<T>(&self, result: Result<T, ApiError>) -> Result<T> {
        result.map_err(|e| {
            if e.is_unauthorized() {
                self.ctx.handle_unauthorized();
            }
            anyhow::Error::new(e)
        })
    }

    fn ensure_no_exam_running(&self) -> Result<()> {
        let state = self.ctx.state.current();
        if matches!(state, SessionState::ExamStarted | SessionState::Submitting) {
            bail!("An exam is in progress ({state}); submit it first");
        }
        Ok(())
    }

    /// Store the token and check it against the backend.
    pub async fn login(&self, token: &str) -> Result<Vec<HiringDrive>> {
        self.ensure_no_exam_running()?;
        self.ctx.store.set_token(token)?;

        match self.client()?.hiring_drives().await {
            Ok(drives) => {
                self.ctx.state.transition(SessionState::LoggedIn)?;
                info!(drives = drives.len(), "logged in");
                Ok(drives)
            }
            Err(e) => {
                if let Err(clear) = self.ctx.store.clear_identity() {
                    warn!(error = %clear, "failed to clear rejected token");
                }
                if let Err(s) = self.ctx.state.transition_unless_submitting(SessionState::LoggedOut) {
                    warn!(error = %s, "failed to record logout");
                }
                Err(anyhow::Error::new(e).context("Login failed"))
            }
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.ensure_no_exam_running()?;
        self.ctx.store.clear_identity()?;
        self.ctx.state.transition_unless_submitting(SessionState::LoggedOut)?;
        Ok(())
    }

    pub async fn drives(&self) -> Result<Vec<HiringDrive>> {
        let client = self.client()?;
        self.checked(client.hiring_drives().await)
    }

    pub async fn exams(&self, drive_id: &str) -> Result<Vec<ExamSummary>> {
        let client = self.client()?;
        self.checked(client.drive_exams(drive_id).await)
    }

    /// Register the attempt with the backend, prepare the workspace and start
    /// proctoring and the countdown.
    pub async fn start_exam(
        &self,
        drive_id: &str,
        exam_id: &str,
        duration_minutes: Option<u32>,
        template: Option<&Path>,
    ) -> Result<PathBuf> {
        let state = self.ctx.state.current();
        if state != SessionState::LoggedIn {
            bail!("Log in before starting an exam (state: {state})");
        }
        let client = self.client()?;

        let minutes = match duration_minutes {
            Some(minutes) => minutes,
            None => {
                let exams = self.checked(client.drive_exams(drive_id).await)?;
                exams
                    .iter()
                    .find(|e| e.id == exam_id)
                    .map(|e| e.duration)
                    .with_context(|| format!("Exam {exam_id} not found in drive {drive_id}"))?
            }
        };

        self.checked(client.start_exam(exam_id, drive_id).await)
            .context("Failed to start exam")?;

        let workspace = self.config.workspace_root.join(format!("exam-{exam_id}"));
        fs::create_dir_all(&workspace)
            .with_context(|| format!("Failed to create workspace {}", workspace.display()))?;
        if let Some(template) = template {
            copy_tree(template, &workspace)
                .with_context(|| format!("Failed to copy {}", template.display()))?;
        }

        self.ctx.store.save_exam(exam_id, drive_id, &workspace)?;
        let documents = open_documents(&workspace);
        self.ctx
            .begin_exam(i64::from(minutes) * 60, documents.iter().map(|f| f.content.as_str()))?;

        info!(exam_id, minutes, workspace = %workspace.display(), "exam started");
        Ok(workspace)
    }

    pub fn status(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            state: self.ctx.state.current(),
            exam_id: self.ctx.store.exam_id()?,
            remaining: self.ctx.timer.remaining()?,
        })
    }

    fn pipeline(&self) -> Result<ClientPipeline> {
        Ok(SubmissionPipeline::new(
            self.ctx.clone(),
            self.client()?,
            SourceBundler::new(&self.config.artifact_dir),
            GitLogCollector::new(self.config.git_log_limit),
            self.config.score()?,
            PipelineSettings {
                workspace_root: self.config.workspace_root.clone(),
                archive_dir: self.config.archive_dir.clone(),
            },
        ))
    }

    /// One-shot submission, for when no `watch` loop is running.
    pub async fn submit(&self, mode: SubmitMode) -> Result<SubmissionOutcome> {
        let pipeline = self.pipeline()?;
        if let Some(outcome) = pipeline.resume_interrupted().await {
            return Ok(outcome);
        }
        let state = self.ctx.state.current();
        if state != SessionState::ExamStarted {
            bail!("No exam in progress (state: {state})");
        }
        Ok(pipeline.submit(mode).await)
    }

    /// Restore the exam, feed host signals to the recorder and submit on a
    /// `submit` line or when the timer runs out.
    pub async fn watch<R, F>(&mut self, input: R, shutdown: F) -> Result<WatchExit>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        let pipeline = self.pipeline()?;
        let documents = self
            .ctx
            .store
            .workspace()?
            .map(|w| open_documents(&w))
            .unwrap_or_default();

        match self.ctx.restore(documents.iter().map(|f| f.content.as_str()))? {
            Restored::Idle(state) => bail!("No exam in progress (state: {state})"),
            Restored::InterruptedSubmission => {
                let mode = SubmitMode::Automatic;
                let outcome = match pipeline.resume_interrupted().await {
                    Some(outcome) => outcome,
                    None => SubmissionOutcome::Skipped,
                };
                return Ok(WatchExit::Submitted { mode, outcome });
            }
            Restored::Exam(resumed) => debug!(?resumed, "watching exam"),
        }

        let ctx = self.ctx.clone();
        let triggers = &mut self.triggers;
        let mut lines = input.lines();
        let mut input_open = true;
        tokio::pin!(shutdown);

        let mode = loop {
            tokio::select! {
                Some(mode) = triggers.recv() => break mode,
                line = lines.next_line(), if input_open => match line {
                    Ok(Some(line)) => {
                        if let Some(mode) = handle_host_line(&ctx, &line) {
                            break mode;
                        }
                    }
                    Ok(None) => {
                        debug!("host input closed; waiting for the timer");
                        input_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read host input");
                        input_open = false;
                    }
                },
                () = &mut shutdown => {
                    info!("watch stopped; the exam stays in progress");
                    return Ok(WatchExit::Interrupted);
                }
            }
        };

        let outcome = pipeline.submit(mode).await;
        Ok(WatchExit::Submitted { mode, outcome })
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.status_indicator.take() {
            self.ctx.state.unsubscribe(handle);
        }
    }
}

fn handle_host_line(ctx: &ExamContext, line: &str) -> Option<SubmitMode> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<HostLine>(line) {
        Ok(HostLine::Command {
            command: HostCommand::Submit,
        }) => Some(SubmitMode::Manual),
        Ok(HostLine::Signal(signal)) => {
            ctx.signals.publish(&signal);
            None
        }
        Err(e) => {
            warn!(error = %e, "ignoring malformed host line");
            None
        }
    }
}

/// Source files of `<workspace>/src`, used to seed the recorder.
fn open_documents(workspace: &Path) -> Vec<SourceFile> {
    let src = workspace.join("src");
    if !src.is_dir() {
        return Vec::new();
    }
    source_files(&src).unwrap_or_else(|e| {
        warn!(error = %e, "failed to snapshot workspace sources");
        Vec::new()
    })
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keys;
    use crate::timer::{FixedClock, ManualScheduler, TimerRecord};
    use chrono::DateTime;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Rig {
        app: App,
        store: Store,
        clock: Arc<FixedClock>,
        scheduler: Arc<ManualScheduler>,
        dir: TempDir,
    }

    fn t0() -> chrono::DateTime<chrono::Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn rig(server: &MockServer) -> Rig {
        rig_with_store(server, Store::in_memory())
    }

    fn rig_with_store(server: &MockServer, store: Store) -> Rig {
        let dir = TempDir::new().unwrap();
        let config = ExamConfig {
            api_base_url: server.uri(),
            store_path: dir.path().join("state.json"),
            artifact_dir: dir.path().join("artifacts"),
            workspace_root: dir.path().join("workspaces"),
            ..ExamConfig::default()
        };
        let clock = Arc::new(FixedClock::at(t0()));
        let scheduler = Arc::new(ManualScheduler::new());
        let app = App::assemble(config, store.clone(), clock.clone(), scheduler.clone(), None);
        Rig {
            app,
            store,
            clock,
            scheduler,
            dir,
        }
    }

    /// A started exam with a managed workspace, as `start` leaves it.
    fn started_exam(rig: &Rig) -> PathBuf {
        let workspace = rig.dir.path().join("workspaces/exam-e1");
        fs::create_dir_all(workspace.join("src")).unwrap();
        fs::write(workspace.join("src/app.ts"), "export {}").unwrap();
        rig.store.set_token("tok").unwrap();
        rig.store.save_exam("e1", "d1", &workspace).unwrap();
        rig.store.set(keys::EXAM_STATE, &SessionState::ExamStarted).unwrap();
        TimerRecord::new(t0(), 3600).save(&rig.store).unwrap();
        workspace
    }

    async fn mount_submission(server: &MockServer, is_passed: bool, score: u8) {
        Mock::given(method("POST"))
            .and(path("/results/me/submit"))
            .and(body_json(json!({
                "examId": "e1", "hiringDriveId": "d1", "isPassed": is_passed, "score": score
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"_id": "r1"}})))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/results/r1/proctoring"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn login_verifies_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/hiring-drives"))
            .and(header("authorization", "Bearer good"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"_id": "d1", "name": "Spring", "code": "S"}]})),
            )
            .mount(&server)
            .await;
        let rig = rig(&server);

        let drives = rig.app.login("good").await.unwrap();
        assert_eq!(drives.len(), 1);
        assert_eq!(rig.app.ctx.state.current(), SessionState::LoggedIn);
        assert_eq!(rig.store.token().unwrap().as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn rejected_login_clears_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/hiring-drives"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let rig = rig(&server);

        assert!(rig.app.login("bad").await.is_err());
        assert_eq!(rig.store.token().unwrap(), None);
        assert_eq!(rig.app.ctx.state.current(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn login_refused_during_exam() {
        let server = MockServer::start().await;
        let rig = rig(&server);
        started_exam(&rig);
        assert!(rig.app.login("again").await.is_err());
        assert_eq!(rig.store.token().unwrap().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn start_exam_uses_server_duration_and_template() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/hiring-drives-exam/d1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"_id": "e1", "title": "Backend", "duration": 30}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/results/me/start"))
            .and(body_json(json!({"examId": "e1", "hiringDriveId": "d1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;
        let rig = rig(&server);
        rig.store.set_token("tok").unwrap();
        rig.app.ctx.state.transition(SessionState::LoggedIn).unwrap();

        let template = TempDir::new().unwrap();
        fs::create_dir_all(template.path().join("src")).unwrap();
        fs::write(template.path().join("src/index.ts"), "export const a = 1;").unwrap();

        let workspace = rig
            .app
            .start_exam("d1", "e1", None, Some(template.path()))
            .await
            .unwrap();

        assert!(workspace.join("src/index.ts").exists());
        assert!(workspace.starts_with(rig.dir.path().join("workspaces")));
        assert_eq!(rig.app.ctx.state.current(), SessionState::ExamStarted);
        assert_eq!(rig.store.exam_id().unwrap().as_deref(), Some("e1"));
        assert_eq!(rig.store.get::<i64>(keys::TIMER_DURATION).unwrap(), Some(1800));
        assert_eq!(rig.scheduler.delays(), vec![Duration::from_secs(1800)]);
        assert!(rig.app.ctx.recorder.is_running());
    }

    #[tokio::test]
    async fn start_requires_login() {
        let server = MockServer::start().await;
        let rig = rig(&server);
        let err = rig.app.start_exam("d1", "e1", Some(10), None).await.unwrap_err();
        assert!(err.to_string().contains("Log in"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_listing_logs_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/hiring-drives"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let rig = rig(&server);
        rig.app.ctx.state.transition(SessionState::LoggedIn).unwrap();

        assert!(rig.app.drives().await.is_err());
        assert_eq!(rig.app.ctx.state.current(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn watch_submits_on_host_command() {
        let server = MockServer::start().await;
        mount_submission(&server, false, 0).await;
        let mut rig = rig(&server);
        let workspace = started_exam(&rig);

        let input: &[u8] = b"{\"signal\":\"focusChanged\",\"focused\":false}\nnot json\n{\"command\":\"submit\"}\n";
        let exit = rig
            .app
            .watch(input, std::future::pending::<()>())
            .await
            .unwrap();

        match exit {
            WatchExit::Submitted { mode, outcome } => {
                assert_eq!(mode, SubmitMode::Manual);
                assert_eq!(outcome, SubmissionOutcome::Submitted { result_id: "r1".into() });
            }
            WatchExit::Interrupted => panic!("expected a submission"),
        }

        let requests = server.received_requests().await.unwrap();
        let upload = requests
            .iter()
            .find(|r| r.url.path() == "/results/r1/proctoring")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&upload.body).unwrap();
        assert_eq!(body["events"][0]["type"], "FOCUS_LOST");
        assert_eq!(body["events"][1]["type"], "GIT_LOGS");

        assert_eq!(rig.app.ctx.state.current(), SessionState::ExamSubmitted);
        assert_eq!(rig.store.token().unwrap(), None);
        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn expiry_while_away_submits_automatically() {
        let server = MockServer::start().await;
        mount_submission(&server, false, 0).await;
        let mut rig = rig(&server);
        started_exam(&rig);
        rig.clock.advance_secs(3700);

        let exit = rig
            .app
            .watch(tokio::io::empty(), std::future::pending::<()>())
            .await
            .unwrap();

        match exit {
            WatchExit::Submitted { mode, outcome } => {
                assert_eq!(mode, SubmitMode::Automatic);
                assert!(matches!(outcome, SubmissionOutcome::Submitted { .. }));
            }
            WatchExit::Interrupted => panic!("expected an automatic submission"),
        }
        assert_eq!(rig.app.ctx.state.current(), SessionState::ExamSubmitted);
    }

    #[tokio::test]
    async fn timer_firing_during_watch_submits_automatically() {
        let server = MockServer::start().await;
        mount_submission(&server, false, 0).await;
        let mut rig = rig(&server);
        started_exam(&rig);

        // The resumed timer is scheduled on the manual scheduler; fire it
        // once the loop is waiting.
        let scheduler = rig.scheduler.clone();
        let fire = async move {
            while scheduler.pending() == 0 {
                tokio::task::yield_now().await;
            }
            scheduler.fire_all();
            std::future::pending::<()>().await
        };

        let exit = tokio::select! {
            exit = rig.app.watch(tokio::io::empty(), std::future::pending::<()>()) => exit.unwrap(),
            () = fire => unreachable!(),
        };
        assert!(matches!(exit, WatchExit::Submitted { mode: SubmitMode::Automatic, .. }));
    }

    #[tokio::test]
    async fn shutdown_leaves_exam_in_progress() {
        let server = MockServer::start().await;
        let mut rig = rig(&server);
        started_exam(&rig);

        let exit = rig
            .app
            .watch(tokio::io::empty(), std::future::ready(()))
            .await
            .unwrap();

        assert!(matches!(exit, WatchExit::Interrupted));
        assert_eq!(rig.app.ctx.state.current(), SessionState::ExamStarted);
        assert_eq!(rig.store.token().unwrap().as_deref(), Some("tok"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_without_exam_keeps_login() {
        let server = MockServer::start().await;
        let rig = rig(&server);
        rig.store.set_token("tok").unwrap();
        rig.app.ctx.state.transition(SessionState::LoggedIn).unwrap();

        let err = rig.app.submit(SubmitMode::Manual).await.unwrap_err();

        assert!(err.to_string().contains("No exam in progress"));
        assert_eq!(rig.app.ctx.state.current(), SessionState::LoggedIn);
        assert_eq!(rig.store.token().unwrap().as_deref(), Some("tok"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_shot_submit_finishes_started_exam() {
        let server = MockServer::start().await;
        mount_submission(&server, false, 0).await;
        let rig = rig(&server);
        started_exam(&rig);

        let outcome = rig.app.submit(SubmitMode::Manual).await.unwrap();

        assert_eq!(outcome, SubmissionOutcome::Submitted { result_id: "r1".into() });
        assert_eq!(rig.app.ctx.state.current(), SessionState::ExamSubmitted);
        assert_eq!(rig.store.token().unwrap(), None);
    }

    #[tokio::test]
    async fn dropping_app_detaches_status_indicator() {
        let server = MockServer::start().await;
        let rig = rig(&server);
        let Rig { app, .. } = rig;
        let app = app.with_status_indicator();
        let handle = app.status_indicator.unwrap();
        let ctx = app.ctx.clone();

        drop(app);
        assert!(!ctx.state.unsubscribe(handle));
    }

    #[tokio::test]
    async fn watch_without_exam_fails() {
        let server = MockServer::start().await;
        let mut rig = rig(&server);
        let err = rig
            .app
            .watch(tokio::io::empty(), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No exam in progress"));
    }

    #[tokio::test]
    async fn status_reports_remaining_time() {
        let server = MockServer::start().await;
        let rig = rig(&server);
        started_exam(&rig);
        rig.clock.advance_secs(600);

        let report = rig.app.status().unwrap();
        assert_eq!(report.state, SessionState::ExamStarted);
        assert_eq!(report.exam_id.as_deref(), Some("e1"));
        assert_eq!(report.remaining, Some(Duration::from_secs(3000)));
    }

    #[test]
    fn host_lines_are_parsed() {
        let rig_store = Store::in_memory();
        let ctx = crate::context::testing::context_rig(rig_store).ctx;
        ctx.begin_exam(60, []).unwrap();

        assert_eq!(handle_host_line(&ctx, r#"{"command":"submit"}"#), Some(SubmitMode::Manual));
        assert_eq!(
            handle_host_line(&ctx, r#"{"signal":"focusChanged","focused":true}"#),
            None
        );
        assert_eq!(handle_host_line(&ctx, "   "), None);
        assert_eq!(handle_host_line(&ctx, r#"{"command":"dance"}"#), None);
        assert_eq!(ctx.session.events().len(), 1);
    }
}
