//! Cliente da Evolution API (provisionamento de instâncias WhatsApp)
//!
//! Cobre apenas o que o fluxo de pareamento usa:
//!
//! - `POST /instance/create` : cria a instância e devolve o primeiro QR code
//! - `GET /instance/connect/{instance}` : QR novo para uma instância existente
//! - `GET /instance/fetchInstances` : status de conexão (`open`, `connecting`, `close`)
//! - `POST /chatwoot/set/{instance}` : registra o roteamento de conversas
//!
//! # Exemplo Básico
//!
//! ```rust,ignore
//! use evolution::EvolutionClient;
//!
//! #[tokio::main]
//! async fn main() -> evolution::Result<()> {
//!     let client = EvolutionClient::new(
//!         std::env::var("EVOLUTION_API_URL").unwrap(),
//!         std::env::var("EVOLUTION_API_KEY").unwrap(),
//!     )?;
//!
//!     let qr = client.create_instance("Loja1", "+55 11 99999-8888").await?;
//!     println!("pairing code: {:?}", qr.pairing_code);
//!
//!     Ok(())
//! }
//! ```

pub mod chatwoot;
pub mod client;
pub mod error;
pub mod instances;
pub mod types;

pub use client::EvolutionClient;
pub use error::{EvolutionError, Result};
pub use instances::digits_only;
pub use types::{ChatwootConfig, ConnectionState, InstanceInfo, QrCode};
