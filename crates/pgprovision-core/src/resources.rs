//! Resource group operations

use crate::client::ArmClient;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// API version for `Microsoft.Resources/resourceGroups`
pub const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";

/// Desired resource group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupSpec {
    pub name: String,
    pub location: String,
}

impl ResourceGroupSpec {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResourceGroupBody<'a> {
    location: &'a str,
}

/// Resource group as reported by the management API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

/// Client for resource group create/update and delete
#[derive(Debug, Clone)]
pub struct GroupsClient {
    client: ArmClient,
}

impl GroupsClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    fn group_url(&self, name: &str) -> Result<url::Url> {
        self.client
            .subscription_url(&["resourcegroups", name], RESOURCE_GROUPS_API_VERSION)
    }

    /// Create the group, or update it if it already exists
    ///
    /// Completes synchronously: the service answers `200` or `201` with the
    /// group record.
    pub async fn create_or_update(&self, spec: &ResourceGroupSpec) -> Result<ResourceGroup> {
        let url = self.group_url(&spec.name)?;
        info!(
            "Creating resource group {} in {}",
            spec.name, spec.location
        );

        let response = self
            .client
            .put_json(
                url.as_str(),
                &ResourceGroupBody {
                    location: &spec.location,
                },
            )
            .await?;

        serde_json::from_value(response.body)
            .map_err(|e| CoreError::InvalidResponse(format!("resource group: {}", e)))
    }

    /// Request deletion of the group
    ///
    /// Returns once the service has accepted the request; the deletion
    /// itself continues remotely.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let url = self.group_url(name)?;
        let response = self.client.delete(url.as_str()).await?;
        debug!(
            "Delete of resource group {} answered {}",
            name,
            response.status.as_u16()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerToken;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn groups_for(server: &MockServer) -> GroupsClient {
        GroupsClient::new(ArmClient::new(
            reqwest::Client::new(),
            url::Url::parse(&server.uri()).unwrap(),
            "sub-1",
            BearerToken::new("tok"),
        ))
    }

    #[tokio::test]
    async fn test_create_or_update() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/subscriptions/sub-1/resourcegroups/postgresql-sample"))
            .and(query_param("api-version", RESOURCE_GROUPS_API_VERSION))
            .and(body_json(json!({"location": "westus"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "/subscriptions/sub-1/resourceGroups/postgresql-sample",
                "name": "postgresql-sample",
                "location": "westus",
                "properties": {"provisioningState": "Succeeded"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let group = groups_for(&server)
            .create_or_update(&ResourceGroupSpec::new("postgresql-sample", "westus"))
            .await
            .unwrap();

        assert_eq!(group.name.as_deref(), Some("postgresql-sample"));
        assert_eq!(
            group.properties.unwrap().provisioning_state.as_deref(),
            Some("Succeeded")
        );
    }

    #[tokio::test]
    async fn test_create_or_update_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": "LocationNotAvailableForResourceGroup", "message": "bad region"}
            })))
            .mount(&server)
            .await;

        let err = groups_for(&server)
            .create_or_update(&ResourceGroupSpec::new("g", "nowhere"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "HTTP 400 (LocationNotAvailableForResourceGroup): bad region"
        );
    }

    #[tokio::test]
    async fn test_delete_accepts_202() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/subscriptions/sub-1/resourcegroups/g"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        groups_for(&server).delete("g").await.unwrap();
    }
}
