//! Serviço da tela de conexões: listagem com cache, exclusão e início do pareamento

use std::sync::Arc;

use uuid::Uuid;

use crate::models::{
    ConnectionListing, ConnectionSummary, ConnectionType, NewConnectionRecord, PairingRequest,
};
use crate::services::backend::BackendClient;
use crate::services::connection_cache::ConnectionCache;
use crate::services::pairing_registry::PairingRegistry;
use crate::services::pairing_workflow::{PairingHandle, PairingWorkflow};
use crate::services::provisioning::{ConnectionStore, EvolutionProvisioning, PairingError};
use crate::utils::logging::*;
use crate::utils::normalization::normalize_instance_name;
use crate::utils::{AppError, AppResult};

pub const MSG_NOME_OBRIGATORIO: &str = "Nome do WhatsApp é obrigatório";
pub const MSG_LIMITE_DISPAROS: &str = "Limite de conexões de disparos acabou";
pub const MSG_PAREAMENTO_EM_ANDAMENTO: &str = "Já existe um pareamento em andamento para este WhatsApp";

impl From<PairingError> for AppError {
    fn from(err: PairingError) -> Self {
        match err {
            PairingError::Validation(msg) => AppError::ValidationError(msg),
            PairingError::Provisioning(msg) => AppError::ProvisioningError(msg),
            PairingError::Poll(msg) => AppError::ProvisioningError(msg),
            PairingError::Persist(msg) => AppError::BackendError(msg),
        }
    }
}

/// Registros de conexão: backend n8n + cache por usuário
#[derive(Clone)]
pub struct ConnectionRepository {
    backend: BackendClient,
    cache: ConnectionCache,
}

impl ConnectionRepository {
    pub fn new(backend: BackendClient, cache: ConnectionCache) -> Self {
        Self { backend, cache }
    }

    pub async fn list(&self, user_id: i64, force_refresh: bool) -> AppResult<ConnectionListing> {
        if !force_refresh {
            if let Some(listing) = self.cache.get(user_id).await {
                tracing::debug!("📦 Conexões do usuário {} servidas do cache", user_id);
                return Ok(listing);
            }
        }

        let listing = self.backend.list_connections(user_id).await?;
        self.cache.put(user_id, listing.clone()).await;
        Ok(listing)
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> AppResult<()> {
        self.backend.delete_connection(user_id, id).await?;
        self.cache.invalidate(user_id).await;
        Ok(())
    }
}

impl ConnectionStore for ConnectionRepository {
    async fn persist_connection(&self, record: &NewConnectionRecord) -> Result<(), PairingError> {
        let result = self.backend.add_connection(record).await;
        // Mesmo com falha a lista pode ter mudado no backend
        self.cache.invalidate(record.id_usuario).await;

        result.map_err(|e| match e {
            AppError::BackendError(msg) => PairingError::Persist(msg),
            other => PairingError::Persist(other.to_string()),
        })
    }
}

#[derive(Clone)]
pub struct ConnectionService {
    repository: Arc<ConnectionRepository>,
    workflow: PairingWorkflow<EvolutionProvisioning, ConnectionRepository>,
    registry: PairingRegistry,
    disparos_limit: usize,
}

impl ConnectionService {
    pub fn new(
        repository: Arc<ConnectionRepository>,
        workflow: PairingWorkflow<EvolutionProvisioning, ConnectionRepository>,
        registry: PairingRegistry,
        disparos_limit: usize,
    ) -> Self {
        Self {
            repository,
            workflow,
            registry,
            disparos_limit,
        }
    }

    pub fn registry(&self) -> &PairingRegistry {
        &self.registry
    }

    pub async fn list(&self, user_id: i64, force_refresh: bool) -> AppResult<ConnectionListing> {
        self.repository.list(user_id, force_refresh).await
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> AppResult<()> {
        self.repository.delete(user_id, id).await
    }

    pub async fn summary(&self, user_id: i64) -> AppResult<ConnectionSummary> {
        let listing = self.list(user_id, false).await?;
        Ok(ConnectionSummary::from_connections(&listing.connections, self.disparos_limit))
    }

    /// Valida o pedido e dispara o workflow. Um pareamento vivo da mesma instância
    /// é devolvido ao mesmo usuário e recusado para outro.
    pub async fn start_pairing(&self, request: PairingRequest) -> AppResult<Arc<PairingHandle>> {
        let instance_name = normalize_instance_name(&request.nome);
        if instance_name.is_empty() {
            log_validation_error("nome", MSG_NOME_OBRIGATORIO);
            return Err(AppError::ValidationError(MSG_NOME_OBRIGATORIO.to_string()));
        }

        if request.tipo == ConnectionType::DisparosEvolution {
            let summary = self.summary(request.id_usuario).await?;
            if summary.disparos_usados >= self.disparos_limit {
                log_validation_error("tipo", MSG_LIMITE_DISPAROS);
                return Err(AppError::ValidationError(MSG_LIMITE_DISPAROS.to_string()));
            }
        }

        // Segura a instância até o handle estar registrado
        let Some(_reservation) = self.registry.reserve(&instance_name) else {
            log_validation_error("nome", MSG_PAREAMENTO_EM_ANDAMENTO);
            return Err(AppError::ValidationError(MSG_PAREAMENTO_EM_ANDAMENTO.to_string()));
        };

        if let Some(live) = self.registry.live_for_instance(&instance_name).await {
            if live.user_id() == request.id_usuario {
                tracing::info!("🔁 Pareamento {} de '{}' ainda vivo; reaproveitado", live.id(), instance_name);
                return Ok(live);
            }
            log_validation_error("nome", MSG_PAREAMENTO_EM_ANDAMENTO);
            return Err(AppError::ValidationError(MSG_PAREAMENTO_EM_ANDAMENTO.to_string()));
        }

        let handle = self.workflow.start(request).await?;
        Ok(self.registry.insert(handle).await)
    }

    pub async fn pairing(&self, id: &Uuid) -> AppResult<Arc<PairingHandle>> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Pareamento {} não encontrado", id)))
    }

    pub async fn cancel_pairing(&self, id: &Uuid) -> AppResult<()> {
        if self.registry.cancel(id).await {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Pareamento {} não encontrado", id)))
        }
    }
}
