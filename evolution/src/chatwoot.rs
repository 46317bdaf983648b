//! Registro da integração Chatwoot (roteamento de conversas) para uma instância

use crate::client::EvolutionClient;
use crate::error::Result;
use crate::types::ChatwootConfig;

impl EvolutionClient {
    /// `POST /chatwoot/set/{instance}`; o corpo da resposta é descartado
    pub async fn set_chatwoot(&self, instance_name: &str, config: &ChatwootConfig) -> Result<()> {
        let endpoint = format!("/chatwoot/set/{}", urlencoding::encode(instance_name));

        self.post(&endpoint, config).await?;

        tracing::info!("💬 Chatwoot configurado para a instância '{}'", instance_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config() -> ChatwootConfig {
        ChatwootConfig {
            enabled: true,
            account_id: "1".into(),
            token: "cw-token".into(),
            url: "https://chat.example.com".into(),
            sign_msg: true,
            reopen_conversation: true,
            conversation_pending: false,
            name_inbox: Some("Loja1".into()),
            auto_create: true,
        }
    }

    #[tokio::test]
    async fn test_set_chatwoot_ignores_response_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chatwoot/set/Loja1")
                    .header("apikey", "secret")
                    .json_body_partial(r#"{"enabled": true, "accountId": "1", "nameInbox": "Loja1"}"#);
                then.status(201).body("not json at all");
            })
            .await;

        let client = EvolutionClient::new(server.base_url(), "secret").unwrap();
        client.set_chatwoot("Loja1", &config()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_chatwoot_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chatwoot/set/Loja1");
                then.status(400).json_body(json!({ "message": "Chatwoot disabled" }));
            })
            .await;

        let client = EvolutionClient::new(server.base_url(), "secret").unwrap();
        assert!(client.set_chatwoot("Loja1", &config()).await.is_err());
    }
}
