//! Tipos de requisição e resposta da Evolution API

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integração padrão usada na criação de instâncias
pub const DEFAULT_INTEGRATION: &str = "WHATSAPP-BAILEYS";

/// Corpo de `POST /instance/create`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub instance_name: String,
    pub number: String,
    pub integration: String,
    pub qrcode: bool,
    pub always_online: bool,
}

/// QR code de pareamento já validado (base64 presente)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QrCode {
    /// Imagem do QR em base64 (normalmente um data URL `data:image/png;base64,...`)
    pub base64: String,
    /// Código numérico curto para parear sem câmera
    pub pairing_code: Option<String>,
}

/// Payload cru do QR, com todos os campos opcionais
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodePayload {
    #[serde(default)]
    pub base64: Option<String>,
    #[serde(default)]
    pub pairing_code: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Resposta de create/connect.
///
/// A API devolve `{ "qrcode": { base64, pairingCode } }` na criação e, dependendo
/// da versão, `{ base64, pairingCode }` direto no connect. Aceitamos os dois.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QrCodeResponse {
    Nested { qrcode: QrCodePayload },
    Flat(QrCodePayload),
}

impl QrCodeResponse {
    pub fn into_payload(self) -> QrCodePayload {
        match self {
            QrCodeResponse::Nested { qrcode } => qrcode,
            QrCodeResponse::Flat(payload) => payload,
        }
    }

    /// Extrai o QR code, falhando se a imagem não veio
    pub fn into_qr_code(self) -> Option<QrCode> {
        let payload = self.into_payload();
        let base64 = payload.base64.filter(|b| !b.trim().is_empty())?;
        let pairing_code = payload.pairing_code.filter(|c| !c.trim().is_empty());

        Some(QrCode { base64, pairing_code })
    }
}

/// Estado de conexão de uma instância
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionState {
    /// Terminal: instância conectada
    Open,
    Connecting,
    Close,
    Other(String),
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConnectionState::Open => "open",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Close => "close",
            ConnectionState::Other(s) => s,
        }
    }
}

impl From<&str> for ConnectionState {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "open" => ConnectionState::Open,
            "connecting" => ConnectionState::Connecting,
            "close" | "closed" => ConnectionState::Close,
            _ => ConnectionState::Other(value.to_string()),
        }
    }
}

impl From<String> for ConnectionState {
    fn from(value: String) -> Self {
        ConnectionState::from(value.as_str())
    }
}

impl From<ConnectionState> for String {
    fn from(value: ConnectionState) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item de `GET /instance/fetchInstances`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
    pub name: String,
    #[serde(default)]
    pub connection_status: Option<ConnectionState>,
    #[serde(default)]
    pub number: Option<String>,
}

/// `fetchInstances` pode responder com array ou com um único objeto
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    Many(Vec<InstanceInfo>),
    One(InstanceInfo),
}

impl From<OneOrMany> for Vec<InstanceInfo> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Corpo de `POST /chatwoot/set/{instance}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatwootConfig {
    pub enabled: bool,
    pub account_id: String,
    pub token: String,
    pub url: String,
    pub sign_msg: bool,
    pub reopen_conversation: bool,
    pub conversation_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_inbox: Option<String>,
    pub auto_create: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_qr_response_nested_shape() {
        let resp: QrCodeResponse = serde_json::from_value(json!({
            "instance": { "instanceName": "Loja1" },
            "qrcode": { "base64": "data:image/png;base64,AAA", "pairingCode": "WZYEH1YY" }
        }))
        .unwrap();

        let qr = resp.into_qr_code().unwrap();
        assert_eq!(qr.base64, "data:image/png;base64,AAA");
        assert_eq!(qr.pairing_code.as_deref(), Some("WZYEH1YY"));
    }

    #[test]
    fn test_qr_response_flat_shape() {
        let resp: QrCodeResponse = serde_json::from_value(json!({
            "base64": "data:image/png;base64,BBB",
            "pairingCode": null,
            "code": "2@abc"
        }))
        .unwrap();

        let qr = resp.into_qr_code().unwrap();
        assert_eq!(qr.base64, "data:image/png;base64,BBB");
        assert!(qr.pairing_code.is_none());
    }

    #[test]
    fn test_qr_response_without_image() {
        let resp: QrCodeResponse = serde_json::from_value(json!({ "count": 0 })).unwrap();
        assert!(resp.into_qr_code().is_none());
    }

    #[test]
    fn test_connection_state_parsing() {
        assert!(ConnectionState::from("open").is_open());
        assert!(ConnectionState::from("OPEN").is_open());
        assert_eq!(ConnectionState::from("connecting"), ConnectionState::Connecting);
        assert_eq!(
            ConnectionState::from("refused"),
            ConnectionState::Other("refused".to_string())
        );
    }

    #[test]
    fn test_instances_single_object() {
        let parsed: OneOrMany = serde_json::from_value(json!({
            "name": "Loja1",
            "connectionStatus": "connecting"
        }))
        .unwrap();

        let items: Vec<InstanceInfo> = parsed.into();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].connection_status, Some(ConnectionState::Connecting));
    }

    #[test]
    fn test_create_request_serialization() {
        let body = CreateInstanceRequest {
            instance_name: "Loja1".into(),
            number: "5511999998888".into(),
            integration: DEFAULT_INTEGRATION.into(),
            qrcode: true,
            always_online: true,
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "instanceName": "Loja1",
                "number": "5511999998888",
                "integration": "WHATSAPP-BAILEYS",
                "qrcode": true,
                "alwaysOnline": true
            })
        );
    }
}
