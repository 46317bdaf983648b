// Biblioteca do serviço de conexões WhatsApp
// Expõe módulos para uso em testes e no binário

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use evolution::EvolutionClient;

use crate::services::{
    BackendClient, ConnectionCache, ConnectionRepository, ConnectionService, EvolutionProvisioning,
    PairingRegistry, PairingWorkflow,
};
use crate::utils::{AppError, AppResult};

// AppState é definido aqui para ser compartilhado
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub evolution: EvolutionClient,
    pub connections: ConnectionService,
}

impl AppState {
    /// Monta clientes e serviços a partir das configurações
    pub fn from_settings(settings: config::Settings) -> AppResult<Self> {
        let pairing = settings
            .pairing
            .to_config()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        let mut evolution = EvolutionClient::new(&settings.evolution.base_url, &settings.evolution.api_key)?;
        if let Some(integration) = settings.evolution.integration.as_deref().filter(|i| !i.is_empty()) {
            evolution = evolution.with_integration(integration);
        }

        let backend = BackendClient::new(&settings.backend, pairing.timezone)?;
        let cache = ConnectionCache::new(Duration::from_secs(settings.connections.cache_ttl_secs));
        let repository = Arc::new(ConnectionRepository::new(backend, cache));

        let provisioning = Arc::new(EvolutionProvisioning::new(evolution.clone(), settings.chatwoot.clone()));
        let workflow = PairingWorkflow::new(pairing, provisioning, Arc::clone(&repository));

        let connections = ConnectionService::new(
            repository,
            workflow,
            PairingRegistry::new(),
            settings.connections.disparos_limit,
        );

        Ok(Self {
            settings,
            evolution,
            connections,
        })
    }
}
