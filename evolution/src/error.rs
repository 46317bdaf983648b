//! Tipos de erro para o crate evolution

use thiserror::Error;

/// Erros do cliente da Evolution API
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Erro de requisição HTTP (rede, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Erro da Evolution API (status code não-2xx)
    #[error("Evolution API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Erro de configuração do cliente
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Erro de validação de entrada
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Resposta sem os campos esperados (ex.: QR code ausente)
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl EvolutionError {
    /// Mensagem vinda do upstream, quando houver
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            EvolutionError::ApiError { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, EvolutionError>;
