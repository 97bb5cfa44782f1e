//! # pgprovision-core
//!
//! Provisions an Azure Database for PostgreSQL server inside a fresh
//! resource group, then deletes the group again.
//!
//! ## Layout
//!
//! - [`config`] - service principal credentials and the optional TOML file
//! - [`auth`] - client-credentials token from the identity endpoint
//! - [`client`] - authenticated management API requests
//! - [`resources`] / [`postgresql`] - resource groups and servers
//! - [`operation`] - long-running operation tracking
//! - [`sequencer`] - the end-to-end run with deferred cleanup
//!
//! ## Example
//!
//! ```rust,no_run
//! use pgprovision_core::{ProvisionConfig, run};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProvisionConfig::load()?;
//! let server = run(&config, |var| std::env::var(var).ok(), None).await?;
//! println!("{:?}", server.name);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod operation;
pub mod postgresql;
pub mod progress;
pub mod resources;
pub mod sequencer;

pub use auth::{BearerToken, acquire_token};
pub use client::ArmClient;
pub use config::{ConfigError, Credentials, ProvisionConfig, REQUIRED_VARS};
pub use error::{CoreError, ErrorKind, Result};
pub use operation::PendingOperation;
pub use postgresql::{Server, ServerSpec, ServersClient};
pub use progress::{ProgressCallback, ProgressEvent};
pub use resources::{GroupsClient, ResourceGroup, ResourceGroupSpec};
pub use sequencer::{
    DeferredDelete, ProvisionError, ProvisionPlan, Provisioner, ResourceGroupApi, ServerApi, Step,
    run,
};
