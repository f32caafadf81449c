//! Tipos de dados das requisições e respostas do backend de provas.
//!
//! O backend embrulha toda resposta em `{"data": ...}` e usa `_id` como
//! identificador; os campos seguem camelCase.

use serde::{Deserialize, Serialize};

use crate::proctor::ProctorEvent;

/// Corpo de `POST /results/me/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubmission {
    pub exam_id: String,
    #[serde(rename = "hiringDriveId")]
    pub drive_id: String,
    pub is_passed: bool,
    /// Nota de 0 a 100.
    pub score: u8,
}

/// Corpo de `POST /results/me/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExamRequest {
    pub exam_id: String,
    #[serde(rename = "hiringDriveId")]
    pub drive_id: String,
}

/// Corpo de `POST /results/{id}/proctoring`.
#[derive(Debug, Serialize)]
pub struct ProctoringUpload<'a> {
    pub events: &'a [ProctorEvent],
}

/// Envelope `{"data": ...}` de todas as respostas.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Resultado gravado pelo servidor.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "_id")]
    pub id: String,
}

/// Um processo seletivo (hiring drive) disponível para o candidato.
#[derive(Debug, Clone, Deserialize)]
pub struct HiringDrive {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// O servidor às vezes manda número, às vezes string.
    #[serde(default)]
    pub code: serde_json::Value,
}

/// Uma prova de um processo seletivo.
#[derive(Debug, Clone, Deserialize)]
pub struct ExamSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    /// Duração em minutos.
    pub duration: u32,
    #[serde(default)]
    pub difficulty: Option<String>,
}
