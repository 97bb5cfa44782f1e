//! Command-line interface definition

use clap::Parser;
use pgprovision_core::ProvisionConfig;
use pgprovision_core::config::MIN_POLL_INTERVAL_MS;

/// Create a PostgreSQL server in a fresh resource group, then remove the group
#[derive(Parser, Debug)]
#[command(name = "pgprovision")]
#[command(
    version,
    about = "Provision an Azure Database for PostgreSQL server in a throwaway resource group"
)]
#[command(long_about = "
Provision an Azure Database for PostgreSQL server in a throwaway resource group

Credentials come from the environment:
    AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET, AZURE_SUBSCRIPTION_ID

The resource group is deleted when the run ends, whether or not the server
was created, unless --keep-resource-group is given.

EXAMPLES:
    # Run with defaults
    pgprovision

    # Different region and server name, JSON result
    pgprovision --location eastus --server-name demo-pg -o json

    # Leave everything in place for inspection
    pgprovision --keep-resource-group -vv
")]
pub struct Cli {
    /// Path to alternate configuration file
    #[arg(long, env = "PGPROVISION_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Resource group to create
    #[arg(long, short = 'g')]
    pub resource_group: Option<String>,

    /// Azure region for the group and the server
    #[arg(long, short = 'l')]
    pub location: Option<String>,

    /// Name of the PostgreSQL server
    #[arg(long, short = 's')]
    pub server_name: Option<String>,

    /// Administrator login for the server
    #[arg(long)]
    pub admin_login: Option<String>,

    /// Administrator password for the server
    #[arg(long, env = "PGPROVISION_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Storage size in MB
    #[arg(long, value_parser = clap::value_parser!(i64).range(5120..))]
    pub storage_mb: Option<i64>,

    /// Delay between status checks when the service gives no hint
    #[arg(long, value_parser = clap::value_parser!(u64).range(MIN_POLL_INTERVAL_MS..))]
    pub poll_interval_ms: Option<u64>,

    /// Do not delete the resource group at the end of the run
    #[arg(long)]
    pub keep_resource_group: bool,

    /// Output format for the created server
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Suppress step and spinner output
    #[arg(long, short)]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(long, short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON document of the server resource
    Json,
}

impl Cli {
    /// Layer command-line overrides on top of the loaded configuration
    pub fn apply_to(&self, config: &mut ProvisionConfig) {
        if let Some(group) = &self.resource_group {
            config.resource_group = group.clone();
        }
        if let Some(location) = &self.location {
            config.location = location.clone();
        }
        if let Some(name) = &self.server_name {
            config.server.name = name.clone();
        }
        if let Some(login) = &self.admin_login {
            config.server.administrator_login = login.clone();
        }
        if let Some(password) = &self.admin_password {
            config.server.administrator_login_password = password.clone();
        }
        if let Some(storage) = self.storage_mb {
            config.server.storage_mb = storage;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.polling.interval_ms = interval;
        }
        if self.keep_resource_group {
            config.keep_resource_group = true;
        }
    }
}
