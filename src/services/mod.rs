pub mod backend;
pub mod connection_cache;
pub mod connections;
pub mod pairing_registry;
pub mod pairing_workflow;
pub mod provisioning;

pub use backend::BackendClient;
pub use connection_cache::ConnectionCache;
pub use connections::{ConnectionRepository, ConnectionService};
pub use pairing_registry::PairingRegistry;
pub use pairing_workflow::{PairingConfig, PairingHandle, PairingWorkflow};
pub use provisioning::{ConnectionStore, EvolutionProvisioning, PairingError, Provisioning};
