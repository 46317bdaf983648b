//! Cliente HTTP para a Evolution API

use crate::error::{EvolutionError, Result};
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Cliente para interagir com a Evolution API
///
/// Todas as chamadas levam o header fixo `apikey`; não há refresh de token.
#[derive(Clone)]
pub struct EvolutionClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    integration: String,
}

impl EvolutionClient {
    /// Cria um novo cliente
    ///
    /// # Timeouts
    ///
    /// - Total: 30s
    /// - Connect: 5s
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeouts(base_url, api_key, 30, 5)
    }

    /// Cria um novo cliente com timeouts customizados
    pub fn with_timeouts(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        total_timeout_secs: u64,
        connect_timeout_secs: u64,
    ) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(total_timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| EvolutionError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(EvolutionError::ConfigError("Evolution base URL is empty".to_string()));
        }

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url,
            integration: crate::types::DEFAULT_INTEGRATION.to_string(),
        })
    }

    /// Define a integração enviada na criação de instâncias
    pub fn with_integration(mut self, integration: impl Into<String>) -> Self {
        self.integration = integration.into();
        self
    }

    /// Executa uma requisição GET
    pub(crate) async fn get(&self, endpoint: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Executa uma requisição GET e parseia JSON
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self.get(endpoint).await?;
        let json = response.json().await?;
        Ok(json)
    }

    /// Executa uma requisição POST
    pub(crate) async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!("POST {} with body: {}", url, serde_json::to_string(body).unwrap_or_default());

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Executa uma requisição POST e parseia JSON
    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.post(endpoint, body).await?;
        let json = response.json().await?;
        Ok(json)
    }

    /// Processa a resposta HTTP e trata erros
    async fn handle_response(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let status_code = status.as_u16();
            let error_body = response.text().await.unwrap_or_default();

            tracing::error!("Evolution API error ({}): {}", status_code, error_body);

            Err(EvolutionError::ApiError {
                status: status_code,
                message: extract_error_message(&error_body),
            })
        }
    }

    /// Verifica se a API responde (usado no readiness)
    pub async fn ping(&self) -> Result<()> {
        self.get("/").await.map(|_| ())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn integration(&self) -> &str {
        &self.integration
    }
}

/// Extrai a mensagem de erro do corpo devolvido pela Evolution API.
///
/// Formatos vistos: `{"response":{"message":["..."]}}`, `{"message":"..."}`,
/// `{"error":"..."}` ou texto puro.
fn extract_error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    let candidate = json
        .pointer("/response/message")
        .or_else(|| json.get("message"))
        .or_else(|| json.get("error"));

    match candidate {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = EvolutionClient::new("https://evo.example.com/", "key").unwrap();
        assert_eq!(client.base_url(), "https://evo.example.com");
        assert_eq!(client.integration(), "WHATSAPP-BAILEYS");
    }

    #[test]
    fn test_client_rejects_empty_url() {
        assert!(EvolutionClient::new("", "key").is_err());
    }

    #[test]
    fn test_extract_error_message_formats() {
        assert_eq!(
            extract_error_message(r#"{"status":403,"response":{"message":["This name \"Loja1\" is already in use."]}}"#),
            "This name \"Loja1\" is already in use."
        );
        assert_eq!(extract_error_message(r#"{"message":"Unauthorized"}"#), "Unauthorized");
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
    }
}
