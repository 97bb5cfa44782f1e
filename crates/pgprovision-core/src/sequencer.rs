//! The provisioning sequence
//!
//! Authenticate, create the resource group, create the server and wait for
//! it, then delete the group again. The first failure ends the run.
//!
//! The sequencer talks to the remote API only through [`ResourceGroupApi`]
//! and [`ServerApi`], so the order of calls can be checked without a
//! network.

use crate::auth::acquire_token;
use crate::client::{ArmClient, http_client};
use crate::config::{Credentials, ProvisionConfig};
use crate::error::{CoreError, ErrorKind};
use crate::operation::PendingOperation;
use crate::postgresql::{Server, ServerSpec, ServersClient};
use crate::progress::{ProgressCallback, ProgressEvent, emit};
use crate::resources::{GroupsClient, ResourceGroup, ResourceGroupSpec};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Resource group operations the sequencer depends on
#[async_trait]
pub trait ResourceGroupApi: Send + Sync {
    async fn create_or_update(&self, spec: &ResourceGroupSpec) -> crate::Result<ResourceGroup>;
    async fn delete(&self, name: &str) -> crate::Result<()>;
}

/// Server operations the sequencer depends on
pub trait ServerApi: Send + Sync {
    /// Start creating a server; returns without waiting for completion
    fn create(
        &self,
        resource_group: &str,
        server_name: &str,
        spec: &ServerSpec,
        on_progress: Option<ProgressCallback>,
    ) -> PendingOperation<Server>;
}

#[async_trait]
impl ResourceGroupApi for GroupsClient {
    async fn create_or_update(&self, spec: &ResourceGroupSpec) -> crate::Result<ResourceGroup> {
        GroupsClient::create_or_update(self, spec).await
    }

    async fn delete(&self, name: &str) -> crate::Result<()> {
        GroupsClient::delete(self, name).await
    }
}

impl ServerApi for ServersClient {
    fn create(
        &self,
        resource_group: &str,
        server_name: &str,
        spec: &ServerSpec,
        on_progress: Option<ProgressCallback>,
    ) -> PendingOperation<Server> {
        ServersClient::create(self, resource_group, server_name, spec, on_progress)
    }
}

/// Steps of the sequence, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    LoadCredentials,
    Authenticate,
    CreateResourceGroup,
    CreateServer,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::LoadCredentials => "Failed to load credentials",
            Step::Authenticate => "Failed to authenticate",
            Step::CreateResourceGroup => "Failed to create or update resource group",
            Step::CreateServer => "Failed to create server",
        };
        f.write_str(label)
    }
}

/// A failed run: the step that failed and why
#[derive(Error, Debug)]
#[error("{step}: {source}")]
pub struct ProvisionError {
    pub step: Step,
    pub source: CoreError,
}

impl ProvisionError {
    pub fn new(step: Step, source: CoreError) -> Self {
        Self { step, source }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// Process exit code for this failure
    ///
    /// Every failure is terminal and reported the same way.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// What to create
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionPlan {
    pub group: ResourceGroupSpec,
    pub server_name: String,
    pub server: ServerSpec,
    pub keep_resource_group: bool,
}

impl ProvisionPlan {
    pub fn from_config(config: &ProvisionConfig) -> Self {
        Self {
            group: ResourceGroupSpec::new(&config.resource_group, &config.location),
            server_name: config.server.name.clone(),
            server: ServerSpec {
                location: config.location.clone(),
                administrator_login: config.server.administrator_login.clone(),
                administrator_login_password: config.server.administrator_login_password.clone(),
                storage_mb: config.server.storage_mb,
            },
            keep_resource_group: config.keep_resource_group,
        }
    }
}

/// Deletes a resource group when the run ends
///
/// [`DeferredDelete::run`] performs the delete and ignores its outcome. A
/// guard dropped without `run` spawns the delete on the current runtime.
pub struct DeferredDelete {
    groups: Arc<dyn ResourceGroupApi>,
    name: Option<String>,
}

impl DeferredDelete {
    pub fn new(groups: Arc<dyn ResourceGroupApi>, name: impl Into<String>) -> Self {
        Self {
            groups,
            name: Some(name.into()),
        }
    }

    pub async fn run(mut self) {
        if let Some(name) = self.name.take() {
            match self.groups.delete(&name).await {
                Ok(()) => debug!("Deletion of resource group {} requested", name),
                Err(e) => debug!("Deletion of resource group {} not confirmed: {}", name, e),
            }
        }
    }
}

impl Drop for DeferredDelete {
    fn drop(&mut self) {
        let Some(name) = self.name.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let groups = self.groups.clone();
                handle.spawn(async move {
                    let _ = groups.delete(&name).await;
                });
            }
            Err(_) => warn!("No runtime available, resource group {} was not deleted", name),
        }
    }
}

/// Authenticated sequencer ready to run a plan
pub struct Provisioner {
    groups: Arc<dyn ResourceGroupApi>,
    servers: Arc<dyn ServerApi>,
    plan: ProvisionPlan,
}

impl Provisioner {
    pub fn new(
        groups: Arc<dyn ResourceGroupApi>,
        servers: Arc<dyn ServerApi>,
        plan: ProvisionPlan,
    ) -> Self {
        Self {
            groups,
            servers,
            plan,
        }
    }

    /// Step 1: read credentials from `env`, acquire a token, build the clients
    ///
    /// Endpoint overrides are read through the same lookup.
    pub async fn connect<F>(config: &ProvisionConfig, env: F) -> Result<Self, ProvisionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::from_lookup(&env)
            .map_err(|e| ProvisionError::new(Step::LoadCredentials, e.into()))?;
        debug!("Loaded credentials: {:?}", credentials);

        let mut endpoints = config.endpoints.clone();
        endpoints.apply_overrides(&env);
        let authority = endpoints
            .authority_url()
            .map_err(|e| ProvisionError::new(Step::Authenticate, e.into()))?;
        let resource_manager = endpoints
            .resource_manager_url()
            .map_err(|e| ProvisionError::new(Step::Authenticate, e.into()))?;

        let http = http_client().map_err(|e| ProvisionError::new(Step::Authenticate, e))?;
        let token = acquire_token(&http, &authority, &credentials)
            .await
            .map_err(|e| ProvisionError::new(Step::Authenticate, e))?;

        let arm = ArmClient::new(
            http,
            resource_manager,
            credentials.subscription_id.clone(),
            token,
        );

        Ok(Self::new(
            Arc::new(GroupsClient::new(arm.clone())),
            Arc::new(ServersClient::new(arm, config.polling.interval())),
            ProvisionPlan::from_config(config),
        ))
    }

    /// Steps 2 to 5: group, deferred delete, server, wait
    pub async fn execute(
        &self,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Server, ProvisionError> {
        let plan = &self.plan;

        step(&on_progress, "Create resource group...");
        self.groups
            .create_or_update(&plan.group)
            .await
            .map_err(|e| ProvisionError::new(Step::CreateResourceGroup, e))?;

        let cleanup = if plan.keep_resource_group {
            info!("Keeping resource group {}", plan.group.name);
            None
        } else {
            Some(DeferredDelete::new(self.groups.clone(), &plan.group.name))
        };

        step(&on_progress, "Create server...");
        let pending = self.servers.create(
            &plan.group.name,
            &plan.server_name,
            &plan.server,
            on_progress.clone(),
        );
        let outcome = pending.wait().await;

        if let Some(cleanup) = cleanup {
            step(&on_progress, "Delete resource group...");
            cleanup.run().await;
        }

        let server = outcome.map_err(|e| ProvisionError::new(Step::CreateServer, e))?;
        info!("Server {} is ready", plan.server_name);
        Ok(server)
    }
}

fn step(on_progress: &Option<ProgressCallback>, description: &str) {
    info!("{}", description);
    emit(
        on_progress,
        ProgressEvent::Step {
            description: description.to_string(),
        },
    );
}

/// Run the whole sequence against the live API described by `config`
///
/// `env` supplies the credential and endpoint variables; the binary passes
/// the process environment.
pub async fn run<F>(
    config: &ProvisionConfig,
    env: F,
    on_progress: Option<ProgressCallback>,
) -> Result<Server, ProvisionError>
where
    F: Fn(&str) -> Option<String>,
{
    Provisioner::connect(config, env)
        .await?
        .execute(on_progress)
        .await
}
