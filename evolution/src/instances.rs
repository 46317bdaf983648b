//! Operações de instância: criação, QR de reconexão e consulta de status

use crate::client::EvolutionClient;
use crate::error::{EvolutionError, Result};
use crate::types::{ConnectionState, CreateInstanceRequest, InstanceInfo, OneOrMany, QrCode, QrCodeResponse};

/// Mantém apenas os dígitos do número (ex.: "+55 11 99999-8888" → "5511999998888")
pub fn digits_only(number: &str) -> String {
    number.chars().filter(|c| c.is_ascii_digit()).collect()
}

impl EvolutionClient {
    /// Cria a instância e devolve o primeiro QR code.
    ///
    /// Não é idempotente: chamar de novo com o mesmo nome pode criar uma instância
    /// duplicada no provedor. Para novas tentativas use [`EvolutionClient::connect_instance`].
    pub async fn create_instance(&self, instance_name: &str, number: &str) -> Result<QrCode> {
        let instance_name = instance_name.trim();
        if instance_name.is_empty() {
            return Err(EvolutionError::ValidationError("instance name is empty".to_string()));
        }

        let body = CreateInstanceRequest {
            instance_name: instance_name.to_string(),
            number: digits_only(number),
            integration: self.integration().to_string(),
            qrcode: true,
            always_online: true,
        };

        tracing::info!("📱 Criando instância '{}' na Evolution API", instance_name);

        let response: QrCodeResponse = self.post_json("/instance/create", &body).await?;

        response.into_qr_code().ok_or_else(|| {
            EvolutionError::InvalidResponse(format!("instance '{}' created without QR code", instance_name))
        })
    }

    /// Solicita um QR code novo para uma instância já criada (somente leitura no provedor)
    pub async fn connect_instance(&self, instance_name: &str, number: &str) -> Result<QrCode> {
        let endpoint = format!(
            "/instance/connect/{}?number={}",
            urlencoding::encode(instance_name),
            digits_only(number)
        );

        let response: QrCodeResponse = self.get_json(&endpoint).await?;

        response.into_qr_code().ok_or_else(|| {
            EvolutionError::InvalidResponse(format!("connect for '{}' returned no QR code", instance_name))
        })
    }

    /// Lista instâncias filtrando pelo nome (o provedor pode devolver array ou objeto)
    pub async fn fetch_instances(&self, instance_name: &str) -> Result<Vec<InstanceInfo>> {
        let endpoint = format!(
            "/instance/fetchInstances?instanceName={}",
            urlencoding::encode(instance_name)
        );

        let parsed: OneOrMany = self.get_json(&endpoint).await?;
        Ok(parsed.into())
    }

    /// Status atual da instância com nome exatamente igual a `instance_name`
    pub async fn connection_state(&self, instance_name: &str) -> Result<Option<ConnectionState>> {
        let instances = self.fetch_instances(instance_name).await?;

        Ok(instances
            .into_iter()
            .find(|i| i.name == instance_name)
            .and_then(|i| i.connection_status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("+55 11 99999-8888"), "5511999998888");
        assert_eq!(digits_only("5511999998888"), "5511999998888");
        assert_eq!(digits_only(""), "");
    }

    #[tokio::test]
    async fn test_create_instance_sends_digits_only_number() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/instance/create")
                    .header("apikey", "secret")
                    .json_body(json!({
                        "instanceName": "Loja1",
                        "number": "5511999998888",
                        "integration": "WHATSAPP-BAILEYS",
                        "qrcode": true,
                        "alwaysOnline": true
                    }));
                then.status(201).json_body(json!({
                    "instance": { "instanceName": "Loja1", "status": "connecting" },
                    "qrcode": { "base64": "data:image/png;base64,QR1", "pairingCode": "ABCD1234" }
                }));
            })
            .await;

        let client = EvolutionClient::new(server.base_url(), "secret").unwrap();
        let qr = client.create_instance("Loja1", "+55 11 99999-8888").await.unwrap();

        mock.assert_async().await;
        assert_eq!(qr.base64, "data:image/png;base64,QR1");
        assert_eq!(qr.pairing_code.as_deref(), Some("ABCD1234"));
    }

    #[tokio::test]
    async fn test_create_instance_surfaces_upstream_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/instance/create");
                then.status(403).json_body(json!({
                    "status": 403,
                    "error": "Forbidden",
                    "response": { "message": ["This name \"Loja1\" is already in use."] }
                }));
            })
            .await;

        let client = EvolutionClient::new(server.base_url(), "secret").unwrap();
        let err = client.create_instance("Loja1", "5511999998888").await.unwrap_err();

        assert_eq!(err.upstream_message(), Some("This name \"Loja1\" is already in use."));
    }

    #[tokio::test]
    async fn test_create_instance_rejects_empty_name() {
        let client = EvolutionClient::new("http://127.0.0.1:9", "secret").unwrap();
        let err = client.create_instance("   ", "5511999998888").await.unwrap_err();
        assert!(matches!(err, EvolutionError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_connect_instance_accepts_flat_shape() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/instance/connect/Loja1")
                    .query_param("number", "5511999998888");
                then.status(200).json_body(json!({
                    "pairingCode": "ZZZZ9999",
                    "code": "2@xyz",
                    "base64": "data:image/png;base64,QR2"
                }));
            })
            .await;

        let client = EvolutionClient::new(server.base_url(), "secret").unwrap();
        let qr = client.connect_instance("Loja1", "5511999998888").await.unwrap();

        mock.assert_async().await;
        assert_eq!(qr.base64, "data:image/png;base64,QR2");
        assert_eq!(qr.pairing_code.as_deref(), Some("ZZZZ9999"));
    }

    #[tokio::test]
    async fn test_connection_state_filters_by_exact_name() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/instance/fetchInstances")
                    .query_param("instanceName", "Loja1");
                then.status(200).json_body(json!([
                    { "name": "Loja10", "connectionStatus": "open" },
                    { "name": "Loja1", "connectionStatus": "connecting" }
                ]));
            })
            .await;

        let client = EvolutionClient::new(server.base_url(), "secret").unwrap();
        let state = client.connection_state("Loja1").await.unwrap();

        assert_eq!(state, Some(ConnectionState::Connecting));
    }

    #[tokio::test]
    async fn test_connection_state_missing_instance() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/instance/fetchInstances");
                then.status(200).json_body(json!([]));
            })
            .await;

        let client = EvolutionClient::new(server.base_url(), "secret").unwrap();
        assert_eq!(client.connection_state("Loja1").await.unwrap(), None);
    }
}
