use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 Nova Europa conexões server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_backend_error(endpoint: &str, status: Option<u16>, error: &str) {
    error!("Backend error: {} - Status: {:?} - Error: {}", endpoint, status, error);
}

pub fn log_pairing_started(instance: &str, attempt: u32) {
    info!("📱 Pareamento iniciado: instância '{}' (tentativa {})", instance, attempt);
}

pub fn log_pairing_refreshed(instance: &str, attempt: u32, max_attempts: u32) {
    info!("🔄 QR code renovado para '{}' (tentativa {}/{})", instance, attempt, max_attempts);
}

pub fn log_pairing_connected(instance: &str) {
    info!("✅ Instância '{}' conectada", instance);
}

pub fn log_pairing_aborted(instance: &str, reason: &str) {
    warn!("⛔ Pareamento de '{}' encerrado: {}", instance, reason);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
