//! Estado transitório do pareamento de uma instância WhatsApp

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use evolution::{ConnectionState, QrCode};
use serde::{Deserialize, Serialize};

use super::connection::ConnectionType;

/// Aviso exibido quando todas as tentativas expiram sem leitura do QR
pub const NOTICE_NO_DEVICE: &str = "Nenhum número foi conectado.";

/// Pedido de pareamento vindo da tela
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingRequest {
    pub id_usuario: i64,
    pub nome: String,
    pub numero: String,
    #[serde(default)]
    pub tipo: ConnectionType,
}

/// Um QR emitido para a instância. Só existe um "vivo" por workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingAttempt {
    pub instance_name: String,
    pub qr_image_data: String,
    pub pairing_code: Option<String>,
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
}

impl PairingAttempt {
    pub fn new(instance_name: &str, qr: QrCode, attempt_number: u32) -> Self {
        Self {
            instance_name: instance_name.to_string(),
            qr_image_data: qr.base64,
            pairing_code: qr.pairing_code,
            attempt_number,
            started_at: Utc::now(),
        }
    }

    /// Bytes da imagem do QR (aceita data URL `data:image/png;base64,...` ou base64 puro)
    pub fn qr_png_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let encoded = match self.qr_image_data.split_once("base64,") {
            Some((_, data)) => data,
            None => self.qr_image_data.as_str(),
        };

        STANDARD.decode(encoded.trim())
    }
}

/// Última amostra de status lida da Evolution API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatusSample {
    pub instance_name: String,
    pub state: ConnectionState,
    pub sampled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    Cancelled,
    TimeoutExhausted { attempts: u32 },
}

impl AbortReason {
    /// Texto mostrado ao usuário, quando houver
    pub fn notice(&self) -> Option<String> {
        match self {
            AbortReason::Cancelled => None,
            AbortReason::TimeoutExhausted { .. } => Some(NOTICE_NO_DEVICE.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PairingState {
    Idle,
    Polling { attempt: u32 },
    /// Conectado; a tela fecha quando `closes_in` chega a zero
    Connected { closes_in: u32 },
    Closed,
    Aborted { reason: AbortReason },
}

impl PairingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PairingState::Closed | PairingState::Aborted { .. })
    }
}

/// O que a tela lê enquanto o pareamento roda
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingSnapshot {
    pub instance_name: String,
    pub state: PairingState,
    pub attempt: Option<PairingAttempt>,
    pub max_attempts: u32,
    /// 0–100, recalculado a cada tick de progresso
    pub progress: f64,
    pub last_sample: Option<ConnectionStatusSample>,
    pub notice: Option<String>,
    /// Falha ao gravar o registro depois de conectar. A conexão continua válida.
    pub persist_error: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PairingSnapshot {
    pub fn idle(instance_name: &str, max_attempts: u32) -> Self {
        Self {
            instance_name: instance_name.to_string(),
            state: PairingState::Idle,
            attempt: None,
            max_attempts,
            progress: 0.0,
            last_sample: None,
            notice: None,
            persist_error: None,
            finished_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_qr_png_bytes_from_data_url() {
        let attempt = PairingAttempt::new(
            "Loja1",
            QrCode {
                base64: "data:image/png;base64,iVBORw0KGgo=".into(),
                pairing_code: None,
            },
            1,
        );

        let bytes = attempt.qr_png_bytes().unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_qr_png_bytes_invalid() {
        let attempt = PairingAttempt::new(
            "Loja1",
            QrCode {
                base64: "data:image/png;base64,@@@".into(),
                pairing_code: None,
            },
            1,
        );

        assert!(attempt.qr_png_bytes().is_err());
    }

    #[test]
    fn test_state_serialization() {
        let state = PairingState::Aborted {
            reason: AbortReason::TimeoutExhausted { attempts: 5 },
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({ "state": "aborted", "reason": { "kind": "timeout_exhausted", "attempts": 5 } })
        );

        assert_eq!(
            serde_json::to_value(PairingState::Polling { attempt: 2 }).unwrap(),
            json!({ "state": "polling", "attempt": 2 })
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PairingState::Idle.is_terminal());
        assert!(!PairingState::Connected { closes_in: 3 }.is_terminal());
        assert!(PairingState::Closed.is_terminal());
        assert!(PairingState::Aborted { reason: AbortReason::Cancelled }.is_terminal());
    }

    #[test]
    fn test_notice() {
        assert_eq!(
            AbortReason::TimeoutExhausted { attempts: 5 }.notice().as_deref(),
            Some("Nenhum número foi conectado.")
        );
        assert!(AbortReason::Cancelled.notice().is_none());
    }

    #[test]
    fn test_request_defaults_to_zap_responder() {
        let req: PairingRequest = serde_json::from_value(json!({
            "id_usuario": 1, "nome": "Loja1", "numero": "+55 11 99999-8888"
        }))
        .unwrap();
        assert_eq!(req.tipo, ConnectionType::ZapResponder);
    }
}
