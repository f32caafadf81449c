//! Coleta do histórico Git do workspace da prova via libgit2.
//!
//! O [`GitLogCollector`] lê os últimos commits do repositório do candidato
//! para anexá-los ao log de proctoring. É uma operação de melhor esforço:
//! qualquer falha vira uma lista vazia, nunca um erro.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::DateTime;
use git2::{Repository, Sort};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Um commit resumido, no formato enviado junto aos eventos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitLog {
    pub commit: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

/// Fonte de histórico de commits. Implementações nunca falham.
pub trait GitLogSource {
    fn collect(&self, workspace: &Path) -> Vec<CommitLog>;
}

/// Lê os commits mais recentes com libgit2.
pub struct GitLogCollector {
    limit: usize,
}

impl GitLogCollector {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Percorre o histórico a partir do HEAD, do mais novo para o mais antigo.
    pub fn recent_commits(&self, workspace: &Path) -> Result<Vec<CommitLog>> {
        let repo = Repository::open(workspace).context("failed to open git repository")?;
        let mut walk = repo.revwalk()?;
        walk.push_head().context("repository has no HEAD")?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        let mut logs = Vec::with_capacity(self.limit);
        for oid in walk.take(self.limit) {
            let commit = repo.find_commit(oid?)?;
            let author = commit.author();
            let date = DateTime::from_timestamp(commit.time().seconds(), 0)
                .map(|d| d.to_rfc3339())
                .unwrap_or_default();
            logs.push(CommitLog {
                commit: commit.id().to_string(),
                author: author.name().unwrap_or("unknown").to_string(),
                date,
                message: commit.summary().unwrap_or("").to_string(),
            });
        }
        Ok(logs)
    }
}

impl Default for GitLogCollector {
    fn default() -> Self {
        Self::new(10)
    }
}

impl GitLogSource for GitLogCollector {
    fn collect(&self, workspace: &Path) -> Vec<CommitLog> {
        match self.recent_commits(workspace) {
            Ok(logs) => {
                debug!(count = logs.len(), "collected git logs");
                logs
            }
            Err(e) => {
                warn!(error = %e, workspace = %workspace.display(), "git logs unavailable, sending none");
                Vec::new()
            }
        }
    }
}
