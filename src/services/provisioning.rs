//! Fronteiras externas do pareamento: provedor WhatsApp e gravação do registro
//!
//! O workflow só conhece estes dois traits. Em produção `EvolutionProvisioning`
//! fala com a Evolution API e `ConnectionRepository` com o backend n8n.

use std::future::Future;

use evolution::{ChatwootConfig, ConnectionState, EvolutionClient, QrCode};
use thiserror::Error;

use crate::config::ChatwootSettings;
use crate::models::NewConnectionRecord;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PairingError {
    /// Criação/renovação do QR falhou
    #[error("{0}")]
    Provisioning(String),

    /// Falha transitória ao consultar o status
    #[error("falha ao consultar status: {0}")]
    Poll(String),

    /// Registro final não foi gravado
    #[error("falha ao gravar conexão: {0}")]
    Persist(String),

    #[error("{0}")]
    Validation(String),
}

impl PairingError {
    fn from_evolution(err: evolution::EvolutionError, fallback: &str) -> Self {
        match err {
            evolution::EvolutionError::ValidationError(msg) => PairingError::Validation(msg),
            other => PairingError::Provisioning(
                other
                    .upstream_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}: {}", fallback, other)),
            ),
        }
    }
}

/// Provedor de instâncias WhatsApp
pub trait Provisioning: Send + Sync + 'static {
    /// Cria a instância e devolve o primeiro QR. Não é seguro repetir.
    fn create_instance(
        &self,
        instance_name: &str,
        number: &str,
    ) -> impl Future<Output = Result<QrCode, PairingError>> + Send;

    /// QR novo para a mesma instância, sem recriá-la
    fn refresh_qr(
        &self,
        instance_name: &str,
        number: &str,
    ) -> impl Future<Output = Result<QrCode, PairingError>> + Send;

    /// `None` quando a instância ainda não aparece na listagem
    fn connection_state(
        &self,
        instance_name: &str,
    ) -> impl Future<Output = Result<Option<ConnectionState>, PairingError>> + Send;

    /// Registra o roteamento de conversas (Chatwoot) da instância
    fn register_routing(&self, instance_name: &str) -> impl Future<Output = Result<(), PairingError>> + Send;
}

/// Onde o registro de conexão é gravado depois do pareamento
pub trait ConnectionStore: Send + Sync + 'static {
    fn persist_connection(
        &self,
        record: &NewConnectionRecord,
    ) -> impl Future<Output = Result<(), PairingError>> + Send;
}

/// `Provisioning` sobre a Evolution API
#[derive(Clone)]
pub struct EvolutionProvisioning {
    client: EvolutionClient,
    chatwoot: Option<ChatwootSettings>,
}

impl EvolutionProvisioning {
    pub fn new(client: EvolutionClient, chatwoot: Option<ChatwootSettings>) -> Self {
        Self { client, chatwoot }
    }

    pub fn client(&self) -> &EvolutionClient {
        &self.client
    }

    fn chatwoot_config(&self, instance_name: &str) -> Option<ChatwootConfig> {
        let settings = self.chatwoot.as_ref().filter(|c| c.enabled)?;

        Some(ChatwootConfig {
            enabled: true,
            account_id: settings.account_id.clone(),
            token: settings.token.clone(),
            url: settings.url.clone(),
            sign_msg: settings.sign_msg,
            reopen_conversation: settings.reopen_conversation,
            conversation_pending: settings.conversation_pending,
            name_inbox: Some(instance_name.to_string()),
            auto_create: true,
        })
    }
}

impl Provisioning for EvolutionProvisioning {
    async fn create_instance(&self, instance_name: &str, number: &str) -> Result<QrCode, PairingError> {
        self.client
            .create_instance(instance_name, number)
            .await
            .map_err(|e| PairingError::from_evolution(e, "Erro ao gerar QR code"))
    }

    async fn refresh_qr(&self, instance_name: &str, number: &str) -> Result<QrCode, PairingError> {
        self.client
            .connect_instance(instance_name, number)
            .await
            .map_err(|e| PairingError::from_evolution(e, "Erro ao renovar QR code"))
    }

    async fn connection_state(&self, instance_name: &str) -> Result<Option<ConnectionState>, PairingError> {
        self.client
            .connection_state(instance_name)
            .await
            .map_err(|e| PairingError::Poll(e.to_string()))
    }

    async fn register_routing(&self, instance_name: &str) -> Result<(), PairingError> {
        let Some(config) = self.chatwoot_config(instance_name) else {
            tracing::debug!("Chatwoot não configurado; instância '{}' sem roteamento", instance_name);
            return Ok(());
        };

        self.client
            .set_chatwoot(instance_name, &config)
            .await
            .map_err(|e| PairingError::Provisioning(e.to_string()))
    }
}
