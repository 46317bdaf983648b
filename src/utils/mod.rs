pub mod error;
pub mod logging;
pub mod normalization;

pub use error::*;
pub use normalization::{format_phone_br, normalize_instance_name, normalize_phone};
