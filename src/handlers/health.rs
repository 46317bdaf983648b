use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "nova-europa-conexoes",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Pronto quando a Evolution API responde
pub async fn ready_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    log_health_check();

    let evolution_status = match state.evolution.ping().await {
        Ok(_) => "connected",
        Err(e) => {
            log_warning(&format!("⚠️ Evolution API indisponível: {}", e));
            "disconnected"
        }
    };

    let ready = evolution_status == "connected";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "ready": ready,
            "service": "nova-europa-conexoes",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "dependencies": {
                "evolution": {
                    "status": evolution_status,
                    "base_url": state.evolution.base_url()
                },
                "backend": {
                    "base_url": state.settings.backend.base_url,
                    "fallback_configured": state.settings.backend.fallback_base_url.is_some()
                }
            },
            "pareamentos_ativos": state.connections.registry().len().await
        })),
    )
}
