/// Serviço de conexões WhatsApp
///
/// - Pareamento de instâncias via Evolution API (QR, consulta de status, renovação)
/// - Registro/listagem/exclusão de conexões no backend n8n
/// - Cada pareamento roda numa task própria; a tela só lê o snapshot

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use nova_europa_conexoes::config::Settings;
use nova_europa_conexoes::handlers;
use nova_europa_conexoes::services::PairingRegistry;
use nova_europa_conexoes::utils::logging::*;
use nova_europa_conexoes::AppState;

/// Por quanto tempo um pareamento encerrado continua consultável
const FINISHED_RETENTION_MINUTES: i64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 🔧 Carregar variáveis de ambiente do arquivo .env (se existir)
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_loaded {
        tracing::info!("✅ Arquivo .env carregado com sucesso");
    } else {
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    let settings = Settings::new().map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    if settings.evolution.api_key.is_empty() {
        log_warning("⚠️ EVOLUTION_API_KEY não configurada - chamadas à Evolution API vão falhar");
    }

    let state = Arc::new(AppState::from_settings(settings.clone())?);
    let registry = state.connections.registry().clone();

    log_info(&format!(
        "✅ Evolution API: {} | backend: {}",
        state.evolution.base_url(),
        settings.backend.base_url
    ));

    spawn_registry_pruner(registry.clone());

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;

    log_server_startup(settings.server.port);
    log_server_ready(settings.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Remove periodicamente pareamentos encerrados
fn spawn_registry_pruner(registry: PairingRegistry) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let removed = registry
                .prune_finished(chrono::Duration::minutes(FINISHED_RETENTION_MINUTES))
                .await;
            if removed > 0 {
                tracing::debug!("🧹 {} pareamento(s) encerrado(s) removido(s)", removed);
            }
        }
    });
}

/// Signal handler para graceful shutdown. Cancela todos os pareamentos vivos.
async fn shutdown_signal(registry: PairingRegistry) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }

    registry.cancel_all().await;
}
