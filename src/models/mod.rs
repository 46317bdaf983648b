pub mod connection;
pub mod pairing;

pub use connection::*;
pub use pairing::*;
