/// Middleware layer para o Axum router
///
/// - Autenticação das rotas `/api/*` via `X-Api-Key`

pub mod api_key;

pub use api_key::require_api_key;
