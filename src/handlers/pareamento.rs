use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::PairingRequest;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

/// Cria a instância, devolve o primeiro QR e deixa o workflow rodando
pub async fn start_pairing(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PairingRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let start_time = Instant::now();
    log_request_received("/api/pareamentos", "POST");

    let handle = state.connections.start_pairing(request).await?;

    log_request_processed("/api/pareamentos", 201, start_time.elapsed().as_millis() as u64);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": handle.id(),
            "snapshot": handle.snapshot()
        })),
    ))
}

pub async fn get_pairing(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> AppResult<Json<Value>> {
    let handle = state.connections.pairing(&id).await?;

    Ok(Json(json!({
        "id": handle.id(),
        "snapshot": handle.snapshot()
    })))
}

/// Imagem PNG do QR atual
pub async fn get_pairing_qrcode(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let handle = state.connections.pairing(&id).await?;
    let snapshot = handle.snapshot();

    if snapshot.state.is_terminal() {
        return Err(AppError::NotFound(format!("Pareamento {} já foi encerrado", id)));
    }

    let attempt = snapshot
        .attempt
        .ok_or_else(|| AppError::NotFound(format!("Pareamento {} ainda sem QR code", id)))?;

    let png = attempt
        .qr_png_bytes()
        .map_err(|e| AppError::ProvisioningError(format!("QR code inválido: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, "image/png"), (header::CACHE_CONTROL, "no-store")], png).into_response())
}

pub async fn cancel_pairing(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> AppResult<Json<Value>> {
    log_request_received("/api/pareamentos/:id", "DELETE");

    state.connections.cancel_pairing(&id).await?;

    Ok(Json(json!({
        "id": id,
        "status": "cancelado"
    })))
}
