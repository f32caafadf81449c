use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::git::CommitLog;

/// What a proctor event records, with only the data relevant to that kind.
///
/// Serialized as `{"type": "LARGE_INSERT", "meta": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "meta", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProctorEventKind {
    Paste,
    LargeInsert {
        len: usize,
        #[serde(rename = "newCode")]
        new_code: bool,
    },
    FocusGained,
    FocusLost,
    GitLogs {
        #[serde(rename = "gitLogs")]
        git_logs: Vec<CommitLog>,
    },
}

impl ProctorEventKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ProctorEventKind::Paste => "PASTE",
            ProctorEventKind::LargeInsert { .. } => "LARGE_INSERT",
            ProctorEventKind::FocusGained => "FOCUS_GAINED",
            ProctorEventKind::FocusLost => "FOCUS_LOST",
            ProctorEventKind::GitLogs { .. } => "GIT_LOGS",
        }
    }
}

/// A timestamped, classified piece of editor activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProctorEvent {
    #[serde(flatten)]
    pub kind: ProctorEventKind,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ProctorEvent {
    pub fn new(kind: ProctorEventKind, timestamp: DateTime<Utc>) -> Self {
        Self { kind, timestamp }
    }
}
