//! Tipos de erro para o cliente da API de provas.
//!
//! Define [`ApiError`] com variantes para sessão expirada, erros HTTP,
//! falhas de rede e respostas malformadas. Usa `thiserror` para derivar
//! `Display` e `Error`.

use thiserror::Error;

/// Erros que podem ocorrer ao falar com o backend de provas.
#[derive(Debug, Error)]
pub enum ApiError {
    /// O servidor respondeu HTTP 401: token ausente, inválido ou expirado.
    #[error("unauthorized: session expired or token invalid")]
    Unauthorized,

    /// Qualquer outro status de erro (4xx/5xx), com a mensagem do corpo.
    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A resposta chegou mas não tem o formato esperado.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// A URL base configurada não serve como raiz de endpoints.
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
