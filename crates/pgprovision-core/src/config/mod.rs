//! Credentials and settings for the provisioning run
//!
//! - Service principal credentials come only from the environment
//! - Resource names, server parameters, polling and endpoints come from an
//!   optional TOML file with environment variable expansion

pub mod credential;
pub mod error;
pub mod settings;

pub use credential::{Credentials, REQUIRED_VARS};
pub use error::{ConfigError, Result};
pub use settings::{
    Endpoints, MIN_POLL_INTERVAL_MS, PollingSettings, ProvisionConfig, ServerSettings,
};
