//! # followloop Config
//!
//! Configuration management for followloop: the TOML process config and
//! validation of user-supplied settings.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{
    ConfigValidator, SettingsValidator, ValidationError, ValidationResult, ValidationWarning,
};
