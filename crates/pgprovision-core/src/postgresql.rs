//! Azure Database for PostgreSQL server operations
//!
//! Server creation is a long-running operation. [`ServersClient::create`]
//! returns a [`PendingOperation`] straight away; the request and all status
//! polling run on a spawned task.

use crate::client::ArmClient;
use crate::error::CoreError;
use crate::operation::{PendingOperation, track};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// API version for `Microsoft.DBforPostgreSQL/servers`
pub const SERVERS_API_VERSION: &str = "2017-12-01";

const PROVIDER: &str = "Microsoft.DBforPostgreSQL";

/// Parameters for a new server
#[derive(Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub location: String,
    pub administrator_login: String,
    pub administrator_login_password: String,
    pub storage_mb: i64,
}

impl fmt::Debug for ServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSpec")
            .field("location", &self.location)
            .field("administrator_login", &self.administrator_login)
            .field("administrator_login_password", &"***")
            .field("storage_mb", &self.storage_mb)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerForCreate<'a> {
    location: &'a str,
    properties: CreateProperties<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateProperties<'a> {
    create_mode: &'static str,
    administrator_login: &'a str,
    administrator_login_password: &'a str,
    storage_profile: StorageProfile,
}

/// Server storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageProfile {
    #[serde(rename = "storageMB", default, skip_serializing_if = "Option::is_none")]
    pub storage_mb: Option<i64>,
    #[serde(
        rename = "backupRetentionDays",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub backup_retention_days: Option<i64>,
}

impl ServerSpec {
    fn to_body(&self) -> ServerForCreate<'_> {
        ServerForCreate {
            location: &self.location,
            properties: CreateProperties {
                create_mode: "Default",
                administrator_login: &self.administrator_login,
                administrator_login_password: &self.administrator_login_password,
                storage_profile: StorageProfile {
                    storage_mb: Some(self.storage_mb),
                    backup_retention_days: None,
                },
            },
        }
    }
}

/// Provisioned server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: Option<ServerProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_visible_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<StorageProfile>,
}

/// Client for PostgreSQL servers in one subscription
#[derive(Debug, Clone)]
pub struct ServersClient {
    client: ArmClient,
    poll_interval: Duration,
}

impl ServersClient {
    pub fn new(client: ArmClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Start creating a server and return its pending operation
    ///
    /// Must be called from within a Tokio runtime.
    pub fn create(
        &self,
        resource_group: &str,
        server_name: &str,
        spec: &ServerSpec,
        on_progress: Option<ProgressCallback>,
    ) -> PendingOperation<Server> {
        let client = self.client.clone();
        let interval = self.poll_interval;
        let resource_group = resource_group.to_string();
        let server_name = server_name.to_string();
        let spec = spec.clone();

        PendingOperation::spawn(async move {
            let url = client.subscription_url(
                &[
                    "resourceGroups",
                    resource_group.as_str(),
                    "providers",
                    PROVIDER,
                    "servers",
                    server_name.as_str(),
                ],
                SERVERS_API_VERSION,
            )?;
            info!(
                "Creating server {} in resource group {}",
                server_name, resource_group
            );

            let initial = client.put_json(url.as_str(), &spec.to_body()).await?;
            let label = format!("create server {}", server_name);
            let body = track(
                &client,
                &label,
                url.as_str(),
                initial,
                interval,
                &on_progress,
            )
            .await?;

            serde_json::from_value(body)
                .map_err(|e| CoreError::InvalidResponse(format!("server: {}", e)))
        })
    }
}
