use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::SubmitError;

/// What gets reported to the results endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub is_passed: bool,
    /// 0..=100
    pub score: u8,
}

impl Score {
    /// The degraded result recorded by the fallback path.
    pub const FAILED: Score = Score {
        is_passed: false,
        score: 0,
    };

    /// Percentage of passing tests, rounded down. Passed only with no failure.
    pub fn from_tests(summary: &TestRunSummary) -> Self {
        if summary.total == 0 {
            return Self::FAILED;
        }
        let pct = (summary.passed.min(summary.total) * 100) / summary.total;
        Score {
            is_passed: summary.failed == 0 && summary.passed > 0,
            score: pct as u8,
        }
    }
}

/// Decides the score of a workspace.
pub trait ScorePolicy {
    async fn evaluate(&self, workspace: &Path) -> Result<Score, SubmitError>;
}

/// Always reports the same score.
#[derive(Debug, Clone, Copy)]
pub struct FixedScore(pub Score);

impl ScorePolicy for FixedScore {
    async fn evaluate(&self, _workspace: &Path) -> Result<Score, SubmitError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestRunSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub duration_ms: u64,
}

pub trait TestRunner {
    async fn run(&self, workspace: &Path) -> Result<TestRunSummary>;
}

/// Scores a workspace by running its test suite.
pub struct TestRunScore<R> {
    runner: R,
}

impl<R: TestRunner> TestRunScore<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: TestRunner> ScorePolicy for TestRunScore<R> {
    async fn evaluate(&self, workspace: &Path) -> Result<Score, SubmitError> {
        let summary = self
            .runner
            .run(workspace)
            .await
            .map_err(|e| SubmitError::Score(format!("{e:#}")))?;
        let score = Score::from_tests(&summary);
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            score = score.score,
            "tests evaluated"
        );
        Ok(score)
    }
}

#[derive(Debug, Deserialize)]
struct PlaywrightReport {
    stats: PlaywrightStats,
}

#[derive(Debug, Deserialize)]
struct PlaywrightStats {
    expected: u32,
    unexpected: u32,
    skipped: u32,
    #[serde(default)]
    flaky: u32,
    #[serde(default)]
    duration: f64,
}

/// Parse the `stats` block of a Playwright JSON report.
pub fn parse_playwright_report(raw: &str) -> Result<TestRunSummary> {
    let report: PlaywrightReport =
        serde_json::from_str(raw).context("Failed to parse Playwright JSON report")?;
    let s = report.stats;
    Ok(TestRunSummary {
        total: s.expected + s.unexpected + s.skipped + s.flaky,
        passed: s.expected,
        failed: s.unexpected,
        skipped: s.skipped,
        duration_ms: s.duration.max(0.0) as u64,
    })
}

/// Runs a shell-less command in the workspace and reads the JSON report it
/// leaves behind.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    program: String,
    args: Vec<String>,
    /// Relative to the workspace.
    report_path: PathBuf,
}

impl CommandTestRunner {
    /// `command` is split on whitespace; the first word is the program.
    pub fn new(command: &str, report_path: impl Into<PathBuf>) -> Result<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let Some(program) = words.next() else {
            bail!("test command is empty");
        };
        Ok(Self {
            program,
            args: words.collect(),
            report_path: report_path.into(),
        })
    }
}

impl TestRunner for CommandTestRunner {
    async fn run(&self, workspace: &Path) -> Result<TestRunSummary> {
        debug!(program = %self.program, args = ?self.args, "running tests");
        let status = Command::new(&self.program)
            .args(&self.args)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        // Failing tests exit non-zero; the report still counts them.
        if !status.success() {
            warn!(code = ?status.code(), "test command exited with failure");
        }

        let report = workspace.join(&self.report_path);
        let raw = tokio::fs::read_to_string(&report)
            .await
            .with_context(|| format!("Test report not found at {}", report.display()))?;
        parse_playwright_report(&raw)
    }
}

/// The policy selected in the configuration.
pub enum ConfiguredScore {
    Fixed(FixedScore),
    Tests(TestRunScore<CommandTestRunner>),
}

impl ScorePolicy for ConfiguredScore {
    async fn evaluate(&self, workspace: &Path) -> Result<Score, SubmitError> {
        match self {
            ConfiguredScore::Fixed(policy) => policy.evaluate(workspace).await,
            ConfiguredScore::Tests(policy) => policy.evaluate(workspace).await,
        }
    }
}
