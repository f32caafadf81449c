//! Configuração do cliente de provas carregada a partir de `exam-proctor.toml`.
//!
//! A struct [`ExamConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `EXAM_API_URL` e `EXAM_STORE_PATH` têm precedência
//! sobre o arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::api::DEFAULT_BASE_URL;
use crate::proctor::RecorderConfig;
use crate::submission::{CommandTestRunner, ConfiguredScore, FixedScore, Score, TestRunScore};

pub const CONFIG_FILE: &str = "exam-proctor.toml";

/// Como a nota é calculada antes do envio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorePolicyKind {
    /// Nota fixa (`fixed_score` / `fixed_passed`).
    #[default]
    Fixed,
    /// Roda os testes do workspace e lê o relatório do Playwright.
    Tests,
}

/// Configuração de nível superior carregada de `exam-proctor.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExamConfig {
    /// URL base da API de provas.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout de cada requisição, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Arquivo JSON com o estado persistido (token, prova, timer).
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Onde o pacote de submissão é gerado.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Raiz dos workspaces temporários. Só eles são apagados após o envio.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Se definido, guarda uma cópia local do pacote e dos eventos.
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,

    /// Quantos commits anexar ao log de proctoring.
    #[serde(default = "default_git_log_limit")]
    pub git_log_limit: usize,

    /// Tamanho mínimo de um paste para ser registrado.
    #[serde(default = "default_paste_min_len")]
    pub paste_min_len: usize,

    /// Tamanho a partir do qual uma inserção é considerada grande.
    #[serde(default = "default_large_insert_min_len")]
    pub large_insert_min_len: usize,

    #[serde(default)]
    pub score_policy: ScorePolicyKind,

    /// Nota enviada pela política `fixed`.
    #[serde(default)]
    pub fixed_score: u8,

    #[serde(default)]
    pub fixed_passed: bool,

    /// Comando que roda os testes dentro do workspace.
    #[serde(default = "default_test_command")]
    pub test_command: String,

    /// Relatório JSON gerado pelo comando, relativo ao workspace.
    #[serde(default = "default_test_report_path")]
    pub test_report_path: PathBuf,
}

// Valor padrão da URL da API: servidor local de desenvolvimento.
fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// Valor padrão do timeout: 15s.
fn default_request_timeout_secs() -> u64 {
    15
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".exam-proctor/state.json")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".exam-proctor/artifacts")
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("exam-proctor")
}

// Valor padrão de commits anexados: 10.
fn default_git_log_limit() -> usize {
    10
}

// Qualquer paste não vazio é registrado.
fn default_paste_min_len() -> usize {
    1
}

// Valor padrão para inserção grande: 50 caracteres.
fn default_large_insert_min_len() -> usize {
    50
}

fn default_test_command() -> String {
    "npm run test".to_string()
}

fn default_test_report_path() -> PathBuf {
    PathBuf::from("playwright-report/report.json")
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            store_path: default_store_path(),
            artifact_dir: default_artifact_dir(),
            workspace_root: default_workspace_root(),
            archive_dir: None,
            git_log_limit: default_git_log_limit(),
            paste_min_len: default_paste_min_len(),
            large_insert_min_len: default_large_insert_min_len(),
            score_policy: ScorePolicyKind::default(),
            fixed_score: 0,
            fixed_passed: false,
            test_command: default_test_command(),
            test_report_path: default_test_report_path(),
        }
    }
}

impl ExamConfig {
    /// Carrega a configuração de `exam-proctor.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new(CONFIG_FILE))?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Carrega de um caminho explícito, sem considerar o ambiente.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<ExamConfig>(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    // Variáveis de ambiente têm precedência sobre o arquivo.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("EXAM_API_URL")
            && !url.is_empty()
        {
            self.api_base_url = url;
        }
        if let Some(path) = var("EXAM_STORE_PATH")
            && !path.is_empty()
        {
            self.store_path = PathBuf::from(path);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn recorder(&self) -> RecorderConfig {
        RecorderConfig {
            paste_min_len: self.paste_min_len,
            large_insert_min_len: self.large_insert_min_len,
        }
    }

    /// Monta a política de nota configurada.
    pub fn score(&self) -> Result<ConfiguredScore> {
        Ok(match self.score_policy {
            ScorePolicyKind::Fixed => ConfiguredScore::Fixed(FixedScore(Score {
                is_passed: self.fixed_passed,
                score: self.fixed_score.min(100),
            })),
            ScorePolicyKind::Tests => ConfiguredScore::Tests(TestRunScore::new(
                CommandTestRunner::new(&self.test_command, &self.test_report_path)?,
            )),
        })
    }
}
