use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use crate::models::ConnectionSummary;
use crate::utils::logging::*;
use crate::utils::AppResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListConnectionsBody {
    pub id_usuario: i64,
    /// Ignora o cache e busca direto no backend
    #[serde(default)]
    pub atualizar: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeleteConnectionBody {
    pub id_usuario: i64,
    pub id: i64,
}

pub async fn list_connections(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ListConnectionsBody>,
) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/api/conexoes/listar", "POST");

    let listing = state.connections.list(body.id_usuario, body.atualizar).await?;
    let resumo = ConnectionSummary::from_connections(
        &listing.connections,
        state.settings.connections.disparos_limit,
    );

    log_request_processed("/api/conexoes/listar", 200, start_time.elapsed().as_millis() as u64);

    Ok(Json(json!({
        "conexoes": listing.connections,
        "resumo": resumo,
        "mensagem": listing.mensagem
    })))
}

pub async fn delete_connection(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DeleteConnectionBody>,
) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/api/conexoes/excluir", "POST");

    state.connections.delete(body.id_usuario, body.id).await?;

    log_request_processed("/api/conexoes/excluir", 200, start_time.elapsed().as_millis() as u64);

    Ok(Json(json!({
        "status": "success",
        "mensagem": "Conexão excluída com sucesso!"
    })))
}
