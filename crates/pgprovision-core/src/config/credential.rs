//! Service principal credentials read from the process environment
//!
//! All four values are required. Resolution never touches the network; a
//! missing value is reported before any request is made.

use super::error::{ConfigError, Result};
use std::env;
use std::fmt;

/// Azure Active Directory tenant ID or domain
pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";
/// Application (client) ID of the service principal
pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
/// Client secret of the service principal
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";
/// Subscription that receives the resource group and server
pub const SUBSCRIPTION_ID_VAR: &str = "AZURE_SUBSCRIPTION_ID";

/// Required variables, in the order they are checked
pub const REQUIRED_VARS: [&str; 4] = [
    TENANT_ID_VAR,
    CLIENT_ID_VAR,
    CLIENT_SECRET_VAR,
    SUBSCRIPTION_ID_VAR,
];

/// Client-credentials identity for the management API
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read credentials through an arbitrary lookup function
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |var: &'static str| -> Result<String> {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingEnvVar { var })
        };

        Ok(Self {
            tenant_id: require(TENANT_ID_VAR)?,
            client_id: require(CLIENT_ID_VAR)?,
            client_secret: require(CLIENT_SECRET_VAR)?,
            subscription_id: require(SUBSCRIPTION_ID_VAR)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (TENANT_ID_VAR, "tenant".to_string()),
            (CLIENT_ID_VAR, "client".to_string()),
            (CLIENT_SECRET_VAR, "secret".to_string()),
            (SUBSCRIPTION_ID_VAR, "sub-123".to_string()),
        ])
    }

    #[test]
    fn test_all_vars_present() {
        let env = full_env();
        let creds = Credentials::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(creds.tenant_id, "tenant");
        assert_eq!(creds.client_id, "client");
        assert_eq!(creds.client_secret, "secret");
        assert_eq!(creds.subscription_id, "sub-123");
    }

    #[test]
    fn test_each_missing_var_is_reported() {
        for missing in REQUIRED_VARS {
            let mut env = full_env();
            env.remove(missing);

            let err = Credentials::from_lookup(|k| env.get(k).cloned()).unwrap_err();
            match err {
                ConfigError::MissingEnvVar { var } => assert_eq!(var, missing),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut env = full_env();
        env.insert(CLIENT_SECRET_VAR, "   ".to_string());

        let err = Credentials::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains(CLIENT_SECRET_VAR));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let env = full_env();
        let creds = Credentials::from_lookup(|k| env.get(k).cloned()).unwrap();
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("***"));
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_process_environment() {
        unsafe {
            env::set_var(TENANT_ID_VAR, "env-tenant");
            env::set_var(CLIENT_ID_VAR, "env-client");
            env::set_var(CLIENT_SECRET_VAR, "env-secret");
            env::set_var(SUBSCRIPTION_ID_VAR, "env-sub");
        }

        let creds = Credentials::from_env().unwrap();
        assert_eq!(creds.tenant_id, "env-tenant");
        assert_eq!(creds.subscription_id, "env-sub");

        unsafe {
            for var in REQUIRED_VARS {
                env::remove_var(var);
            }
        }
    }
}
