pub mod settings;

pub use settings::{
    BackendSettings, ChatwootSettings, ConnectionsSettings, EvolutionSettings, PairingSettings,
    ServerSettings, Settings,
};
