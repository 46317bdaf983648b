//! Cliente do backend n8n que guarda os registros de conexão
//!
//! Toda requisição vai primeiro ao host principal. Erro de rede ou HTTP 500
//! refaz a mesma chamada uma vez no host alternativo; qualquer outro status
//! é devolvido como veio.

use std::time::Duration;

use chrono::FixedOffset;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::BackendSettings;
use crate::models::{BackendConnectionRow, ConnectionListing, NewConnectionRecord};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};

pub const ADD_CONNECTION_PATH: &str = "/api/adiciona-conexao";
pub const LIST_CONNECTIONS_PATH: &str = "/api/conexoes";
pub const DELETE_CONNECTION_PATH: &str = "/api/excluir-conexoes";

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    fallback_base_url: Option<String>,
    api_key: Option<String>,
    timezone: FixedOffset,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings, timezone: FixedOffset) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = settings.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::ConfigError("backend.base_url is empty".to_string()));
        }

        let fallback_base_url = settings
            .fallback_base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty() && *url != base_url);

        Ok(Self {
            http,
            base_url,
            fallback_base_url,
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            timezone,
        })
    }

    async fn send<B: Serialize + ?Sized>(&self, base_url: &str, path: &str, body: &B) -> reqwest::Result<Response> {
        let url = format!("{}{}", base_url, path);
        tracing::debug!("POST {}", url);

        let mut request = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        request.send().await
    }

    /// POST no host principal, com uma segunda chance no host alternativo
    async fn post_with_fallback<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> AppResult<Response> {
        let primary = self.send(&self.base_url, path, body).await;

        let retry_reason = match &primary {
            Ok(response) if response.status() != StatusCode::INTERNAL_SERVER_ERROR => None,
            Ok(response) => Some(format!("status {}", response.status().as_u16())),
            Err(e) => Some(e.to_string()),
        };

        let (Some(reason), Some(fallback)) = (retry_reason, self.fallback_base_url.as_deref()) else {
            return primary.map_err(AppError::from);
        };

        log_warning(&format!("⚠️ Backend principal falhou em {} ({}), tentando {}", path, reason, fallback));

        self.send(fallback, path, body).await.map_err(AppError::from)
    }

    /// Grava o registro de uma conexão recém pareada
    pub async fn add_connection(&self, record: &NewConnectionRecord) -> AppResult<()> {
        let response = self.post_with_fallback(ADD_CONNECTION_PATH, record).await?;
        let status = response.status();

        if status.is_success() {
            log_info(&format!("💾 Conexão '{}' registrada para usuário {}", record.nome, record.id_usuario));
            return Ok(());
        }

        let message = backend_message(response).await.unwrap_or_else(|| "Erro ao registrar conexão".to_string());
        log_backend_error(ADD_CONNECTION_PATH, Some(status.as_u16()), &message);
        Err(AppError::BackendError(message))
    }

    /// Lista as conexões do usuário. 400 significa "nenhuma conexão" e traz a `mensagem` do backend.
    pub async fn list_connections(&self, user_id: i64) -> AppResult<ConnectionListing> {
        let response = self
            .post_with_fallback(LIST_CONNECTIONS_PATH, &json!({ "id_usuario": user_id }))
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: Value = response.json().await?;
                let rows: Vec<BackendConnectionRow> = match body {
                    Value::Array(_) => serde_json::from_value(body)?,
                    Value::Null => Vec::new(),
                    single @ Value::Object(_) => vec![serde_json::from_value(single)?],
                    other => {
                        return Err(AppError::BackendError(format!(
                            "Resposta inesperada de {}: {}",
                            LIST_CONNECTIONS_PATH, other
                        )))
                    }
                };

                Ok(ConnectionListing {
                    connections: rows.into_iter().map(|row| row.into_connection(self.timezone)).collect(),
                    mensagem: None,
                })
            }
            StatusCode::BAD_REQUEST => Ok(ConnectionListing {
                connections: Vec::new(),
                mensagem: backend_message(response).await,
            }),
            status => {
                log_backend_error(LIST_CONNECTIONS_PATH, Some(status.as_u16()), "status inesperado");
                Err(AppError::BackendError("Erro desconhecido".to_string()))
            }
        }
    }

    pub async fn delete_connection(&self, user_id: i64, id: i64) -> AppResult<()> {
        let response = self
            .post_with_fallback(DELETE_CONNECTION_PATH, &json!({ "id_usuario": user_id, "id": id }))
            .await?;
        let status = response.status();

        if status.is_success() {
            log_info(&format!("🗑️ Conexão {} excluída (usuário {})", id, user_id));
            return Ok(());
        }

        let message = backend_message(response).await.unwrap_or_else(|| "Erro ao excluir conexão".to_string());
        log_backend_error(DELETE_CONNECTION_PATH, Some(status.as_u16()), &message);
        Err(AppError::BackendError(message))
    }
}

/// Campo `mensagem` do corpo de erro, quando existir
async fn backend_message(response: Response) -> Option<String> {
    let body: Value = response.json().await.ok()?;
    body.get("mensagem")
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionStatus, ConnectionType};
    use httpmock::prelude::*;

    fn brasilia() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn client(primary: &MockServer, fallback: Option<&MockServer>) -> BackendClient {
        let settings = BackendSettings {
            base_url: primary.base_url(),
            fallback_base_url: fallback.map(|f| f.base_url()),
            api_key: None,
        };
        BackendClient::new(&settings, brasilia()).unwrap()
    }

    #[tokio::test]
    async fn test_list_connections_maps_rows() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(LIST_CONNECTIONS_PATH)
                    .json_body(serde_json::json!({ "id_usuario": 42 }));
                then.status(200).json_body(serde_json::json!([
                    {
                        "id": 1,
                        "nome": "Loja1",
                        "numero_zap": "5511999998888",
                        "equipe": "Vendas",
                        "tipo_conexao": "Zap Responder",
                        "status": 1,
                        "data_cadastro": "2025-06-11T18:05:00.000Z"
                    },
                    {
                        "id": 2,
                        "nome": "Disparo",
                        "tipo_conexao": "Disparos Evolution",
                        "status": 0
                    }
                ]));
            })
            .await;

        let listing = client(&server, None).list_connections(42).await.unwrap();
        mock.assert_async().await;

        assert_eq!(listing.connections.len(), 2);
        assert!(listing.mensagem.is_none());
        assert_eq!(listing.connections[0].status, ConnectionStatus::Conectado);
        assert_eq!(listing.connections[0].data_cadastro, "11/06/2025 15:05");
        assert_eq!(listing.connections[1].tipo, ConnectionType::DisparosEvolution);
        assert_eq!(listing.connections[1].status, ConnectionStatus::Desconectado);
    }

    #[tokio::test]
    async fn test_list_connections_400_is_empty_with_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(LIST_CONNECTIONS_PATH);
                then.status(400)
                    .json_body(serde_json::json!({ "mensagem": "Nenhuma conexão encontrada" }));
            })
            .await;

        let listing = client(&server, None).list_connections(42).await.unwrap();
        assert!(listing.connections.is_empty());
        assert_eq!(listing.mensagem.as_deref(), Some("Nenhuma conexão encontrada"));
    }

    #[tokio::test]
    async fn test_list_connections_other_status_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(LIST_CONNECTIONS_PATH);
                then.status(404);
            })
            .await;

        let err = client(&server, None).list_connections(42).await.unwrap_err();
        assert!(matches!(err, AppError::BackendError(_)));
    }

    #[tokio::test]
    async fn test_fallback_on_500() {
        let primary = MockServer::start_async().await;
        let fallback = MockServer::start_async().await;

        let primary_mock = primary
            .mock_async(|when, then| {
                when.method(POST).path(ADD_CONNECTION_PATH);
                then.status(500);
            })
            .await;
        let fallback_mock = fallback
            .mock_async(|when, then| {
                when.method(POST)
                    .path(ADD_CONNECTION_PATH)
                    .json_body_partial(r#"{"nome":"Loja1","status":"Conectado"}"#);
                then.status(200).json_body(serde_json::json!({ "ok": true }));
            })
            .await;

        let record = NewConnectionRecord::connected(42, "Loja1", "5511999998888", "2025-06-11 15:05".into());
        client(&primary, Some(&fallback)).add_connection(&record).await.unwrap();

        primary_mock.assert_async().await;
        fallback_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_fallback_on_400() {
        let primary = MockServer::start_async().await;
        let fallback = MockServer::start_async().await;

        primary
            .mock_async(|when, then| {
                when.method(POST).path(DELETE_CONNECTION_PATH);
                then.status(400).json_body(serde_json::json!({ "mensagem": "Conexão não encontrada" }));
            })
            .await;
        let fallback_mock = fallback
            .mock_async(|when, then| {
                when.method(POST).path(DELETE_CONNECTION_PATH);
                then.status(200);
            })
            .await;

        let err = client(&primary, Some(&fallback)).delete_connection(42, 7).await.unwrap_err();

        match err {
            AppError::BackendError(msg) => assert_eq!(msg, "Conexão não encontrada"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(fallback_mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_delete_error_without_message_uses_default_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(DELETE_CONNECTION_PATH)
                    .json_body(serde_json::json!({ "id_usuario": 42, "id": 7 }));
                then.status(422).body("nope");
            })
            .await;

        let err = client(&server, None).delete_connection(42, 7).await.unwrap_err();
        match err {
            AppError::BackendError(msg) => assert_eq!(msg, "Erro ao excluir conexão"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fallback_on_network_error() {
        let fallback = MockServer::start_async().await;
        let fallback_mock = fallback
            .mock_async(|when, then| {
                when.method(POST).path(LIST_CONNECTIONS_PATH);
                then.status(200).json_body(serde_json::json!([]));
            })
            .await;

        let settings = BackendSettings {
            // Porta fechada: erro de conexão imediato
            base_url: "http://127.0.0.1:1".into(),
            fallback_base_url: Some(fallback.base_url()),
            api_key: None,
        };
        let listing = BackendClient::new(&settings, brasilia())
            .unwrap()
            .list_connections(42)
            .await
            .unwrap();

        assert!(listing.connections.is_empty());
        fallback_mock.assert_async().await;
    }
}
