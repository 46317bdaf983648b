/// Middleware de autenticação das rotas `/api/*`
///
/// Valida o header `X-Api-Key` contra a variável de ambiente `API_KEY`.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// `API_KEY` ausente em desenvolvimento: libera com warning
    GrantedUnconfigured,
    Denied,
    /// `API_KEY` ausente em produção: bloqueia tudo
    Unconfigured,
}

/// Decide o acesso a partir da chave esperada, da chave enviada e do ambiente
pub fn check_access(expected: Option<&str>, provided: Option<&str>, is_production: bool) -> Access {
    match (expected.filter(|k| !k.is_empty()), provided, is_production) {
        (Some(expected), Some(provided), _) if expected == provided => Access::Granted,
        (Some(_), _, _) => Access::Denied,
        (None, _, false) => Access::GrantedUnconfigured,
        (None, _, true) => Access::Unconfigured,
    }
}

/// Middleware que exige `X-Api-Key`
///
/// # Respostas
///
/// - **401 Unauthorized**: key ausente ou inválida
/// - **503 Service Unavailable**: `API_KEY` não configurada em produção
pub async fn require_api_key(headers: HeaderMap, request: Request, next: Next) -> Result<Response, Response> {
    let provided_key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    let expected_key = std::env::var("API_KEY").ok();
    let is_production = std::env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()) == "production";

    match check_access(expected_key.as_deref(), provided_key, is_production) {
        Access::Granted => Ok(next.run(request).await),
        Access::GrantedUnconfigured => {
            tracing::warn!("⚠️  API_KEY not configured - Allowing access in development mode");
            Ok(next.run(request).await)
        }
        Access::Denied => {
            tracing::warn!(
                "❌ API access denied - Invalid or missing {}: {:?}",
                API_KEY_HEADER,
                provided_key.map(|_| "<redacted>")
            );
            Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Unauthorized",
                    "message": "Missing or invalid X-Api-Key header"
                })),
            )
                .into_response())
        }
        Access::Unconfigured => {
            tracing::error!("🚨 API_KEY not configured in production! Blocking API access.");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Service Unavailable",
                    "message": "API_KEY not configured on server"
                })),
            )
                .into_response())
        }
    }
}
