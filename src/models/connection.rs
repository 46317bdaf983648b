//! Registros de conexão WhatsApp guardados no backend (n8n)

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::normalization::{format_data_cadastro, format_phone_br};

pub const STATUS_CONECTADO: &str = "Conectado";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionType {
    #[serde(rename = "Zap Responder")]
    ZapResponder,
    #[serde(rename = "Disparos Evolution")]
    DisparosEvolution,
}

impl Default for ConnectionType {
    fn default() -> Self {
        ConnectionType::ZapResponder
    }
}

impl ConnectionType {
    pub fn from_backend(tipo: Option<&str>) -> Self {
        match tipo {
            Some("Disparos Evolution") => ConnectionType::DisparosEvolution,
            _ => ConnectionType::ZapResponder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Conectado,
    Desconectado,
}

impl ConnectionStatus {
    /// O backend marca conexões ativas com `1` (às vezes `"1"` ou `true`)
    pub fn from_backend(status: &Value) -> Self {
        let connected = match status {
            Value::Number(n) => n.as_i64() == Some(1),
            Value::String(s) => s == "1" || s.eq_ignore_ascii_case(STATUS_CONECTADO),
            Value::Bool(b) => *b,
            _ => false,
        };

        if connected {
            ConnectionStatus::Conectado
        } else {
            ConnectionStatus::Desconectado
        }
    }
}

/// Conexão como exibida na tela de conexões
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: i64,
    pub nome: String,
    pub numero: String,
    pub equipe: String,
    pub tipo: ConnectionType,
    pub status: ConnectionStatus,
    pub data_cadastro: String,
    pub qr_code: String,
}

/// Linha crua de `POST /api/conexoes`
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConnectionRow {
    pub id: i64,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub numero_zap: Option<String>,
    #[serde(default)]
    pub equipe: Option<String>,
    #[serde(default)]
    pub tipo_conexao: Option<String>,
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub data_cadastro: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
}

impl BackendConnectionRow {
    pub fn into_connection(self, timezone: FixedOffset) -> Connection {
        Connection {
            id: self.id,
            nome: self.nome.unwrap_or_default(),
            numero: self.numero_zap.map(|n| format_phone_br(&n)).unwrap_or_default(),
            equipe: self.equipe.unwrap_or_default(),
            tipo: ConnectionType::from_backend(self.tipo_conexao.as_deref()),
            status: ConnectionStatus::from_backend(&self.status),
            data_cadastro: self
                .data_cadastro
                .map(|d| format_data_cadastro(&d, timezone))
                .unwrap_or_default(),
            qr_code: self.qr_code.unwrap_or_default(),
        }
    }
}

/// Corpo de `POST /api/adiciona-conexao`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConnectionRecord {
    pub id_usuario: i64,
    pub nome: String,
    pub numero: String,
    pub status: String,
    pub data_hora: String,
}

impl NewConnectionRecord {
    pub fn connected(id_usuario: i64, nome: &str, numero: &str, data_hora: String) -> Self {
        Self {
            id_usuario,
            nome: nome.to_string(),
            numero: numero.to_string(),
            status: STATUS_CONECTADO.to_string(),
            data_hora,
        }
    }
}

/// Resultado da listagem: o backend responde 400 com `mensagem` quando não há conexões
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionListing {
    pub connections: Vec<Connection>,
    pub mensagem: Option<String>,
}

/// Números dos cards do topo da tela
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub total: usize,
    pub online: usize,
    pub disparos_usados: usize,
    pub disparos_limite: usize,
}

impl ConnectionSummary {
    pub fn from_connections(connections: &[Connection], disparos_limite: usize) -> Self {
        Self {
            total: connections.len(),
            online: connections
                .iter()
                .filter(|c| c.status == ConnectionStatus::Conectado)
                .count(),
            disparos_usados: connections
                .iter()
                .filter(|c| c.tipo == ConnectionType::DisparosEvolution)
                .count(),
            disparos_limite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn brasilia() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    #[test]
    fn test_row_mapping() {
        let row: BackendConnectionRow = serde_json::from_value(json!({
            "id": 7,
            "nome": "Loja1",
            "numero_zap": "5511999998888",
            "equipe": "Vendas",
            "tipo_conexao": "Disparos Evolution",
            "status": 1,
            "data_cadastro": "2025-06-11T18:05:00.000Z",
            "qr_code": null
        }))
        .unwrap();

        let conn = row.into_connection(brasilia());
        assert_eq!(conn.id, 7);
        assert_eq!(conn.numero, "+55 11 99999-8888");
        assert_eq!(conn.tipo, ConnectionType::DisparosEvolution);
        assert_eq!(conn.status, ConnectionStatus::Conectado);
        assert_eq!(conn.data_cadastro, "11/06/2025 15:05");
        assert_eq!(conn.qr_code, "");
    }

    #[test]
    fn test_status_variants() {
        assert_eq!(ConnectionStatus::from_backend(&json!(1)), ConnectionStatus::Conectado);
        assert_eq!(ConnectionStatus::from_backend(&json!("1")), ConnectionStatus::Conectado);
        assert_eq!(ConnectionStatus::from_backend(&json!(0)), ConnectionStatus::Desconectado);
        assert_eq!(ConnectionStatus::from_backend(&Value::Null), ConnectionStatus::Desconectado);
    }

    #[test]
    fn test_unknown_type_defaults_to_zap_responder() {
        assert_eq!(ConnectionType::from_backend(Some("outro")), ConnectionType::ZapResponder);
        assert_eq!(ConnectionType::from_backend(None), ConnectionType::ZapResponder);
    }

    #[test]
    fn test_summary() {
        let make = |id, tipo, status| Connection {
            id,
            nome: format!("c{}", id),
            numero: String::new(),
            equipe: String::new(),
            tipo,
            status,
            data_cadastro: String::new(),
            qr_code: String::new(),
        };

        let connections = vec![
            make(1, ConnectionType::ZapResponder, ConnectionStatus::Conectado),
            make(2, ConnectionType::DisparosEvolution, ConnectionStatus::Desconectado),
            make(3, ConnectionType::ZapResponder, ConnectionStatus::Conectado),
        ];

        let summary = ConnectionSummary::from_connections(&connections, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.online, 2);
        assert_eq!(summary.disparos_usados, 1);
        assert_eq!(summary.disparos_limite, 1);
    }

    #[test]
    fn test_new_record_body() {
        let record = NewConnectionRecord::connected(42, "Loja1", "5511999998888", "2025-06-11 15:05".into());
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "id_usuario": 42,
                "nome": "Loja1",
                "numero": "5511999998888",
                "status": "Conectado",
                "data_hora": "2025-06-11 15:05"
            })
        );
    }
}
