// Handlers HTTP da tela de conexões
pub mod conexoes;
pub mod health;
pub mod pareamento;

pub use conexoes::*;
pub use health::*;
pub use pareamento::*;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::middleware::require_api_key;
use crate::AppState;

/// Rotas do serviço. `/health` e `/ready` são públicas; `/api/*` exige `X-Api-Key`.
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/api/conexoes/listar", post(list_connections))
        .route("/api/conexoes/excluir", post(delete_connection))
        .route("/api/pareamentos", post(start_pairing))
        .route("/api/pareamentos/:id", get(get_pairing).delete(cancel_pairing))
        .route("/api/pareamentos/:id/qrcode", get(get_pairing_qrcode))
        .layer(middleware::from_fn(require_api_key));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(api_routes)
        .with_state(state)
}
