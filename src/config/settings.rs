use chrono::FixedOffset;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::services::pairing_workflow::PairingConfig;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub evolution: EvolutionSettings,
    pub backend: BackendSettings,
    pub chatwoot: Option<ChatwootSettings>,
    #[serde(default)]
    pub pairing: PairingSettings,
    #[serde(default)]
    pub connections: ConnectionsSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EvolutionSettings {
    pub base_url: String,
    pub api_key: String,
    pub integration: Option<String>,
}

/// Backend de automação (n8n) que guarda os registros de conexão
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub fallback_base_url: Option<String>,  // Host alternativo usado quando o principal dá 500
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatwootSettings {
    pub enabled: bool,
    pub account_id: String,
    pub token: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub sign_msg: bool,
    #[serde(default = "default_true")]
    pub reopen_conversation: bool,
    #[serde(default)]
    pub conversation_pending: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PairingSettings {
    pub poll_interval_ms: u64,
    pub attempt_timeout_ms: u64,
    pub progress_tick_ms: u64,
    pub max_attempts: u32,
    pub close_countdown_secs: u32,
    pub timezone_offset_hours: i32,  // Horário civil fixo do registro (Brasília = -3)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectionsSettings {
    pub cache_ttl_secs: u64,
    pub disparos_limit: usize,
}

fn default_true() -> bool {
    true
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3_000,
            attempt_timeout_ms: 30_000,
            progress_tick_ms: 100,
            max_attempts: 5,
            close_countdown_secs: 3,
            timezone_offset_hours: -3,
        }
    }
}

impl Default for ConnectionsSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            disparos_limit: 1,
        }
    }
}

impl PairingSettings {
    /// Converte para a configuração do workflow, validando os limites
    pub fn to_config(&self) -> Result<PairingConfig, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Message("pairing.max_attempts must be at least 1".into()));
        }
        if self.poll_interval_ms == 0 || self.attempt_timeout_ms == 0 || self.progress_tick_ms == 0 {
            return Err(ConfigError::Message("pairing intervals must be greater than zero".into()));
        }

        let timezone = FixedOffset::east_opt(self.timezone_offset_hours * 3600).ok_or_else(|| {
            ConfigError::Message(format!(
                "invalid pairing.timezone_offset_hours: {}",
                self.timezone_offset_hours
            ))
        })?;

        Ok(PairingConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
            progress_tick: Duration::from_millis(self.progress_tick_ms),
            max_attempts: self.max_attempts,
            close_countdown: self.close_countdown_secs,
            timezone,
        })
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Variáveis de ambiente específicas
        if let Ok(url) = std::env::var("EVOLUTION_API_URL") {
            builder = builder.set_override("evolution.base_url", url)?;
        }
        if let Ok(key) = std::env::var("EVOLUTION_API_KEY") {
            builder = builder.set_override("evolution.api_key", key)?;
        }
        if let Ok(url) = std::env::var("N8N_BASE_URL") {
            builder = builder.set_override("backend.base_url", url)?;
        }
        if let Ok(url) = std::env::var("N8N_FALLBACK_URL") {
            builder = builder.set_override("backend.fallback_base_url", url)?;
        }
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        builder = builder.add_source(Environment::with_prefix("NOVA_EUROPA").separator("__"));

        let s = builder.build()?;

        s.try_deserialize()
    }
}
