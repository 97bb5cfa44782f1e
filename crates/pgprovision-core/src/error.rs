//! Unified error handling for pgprovision-core
//!
//! Every failure the sequencer can hit is a [`CoreError`]. Callers that only
//! need the coarse category use [`CoreError::kind`].
//!
//! # Example
//!
//! ```rust
//! use pgprovision_core::{CoreError, ErrorKind};
//!
//! let err = CoreError::Api {
//!     status: 404,
//!     code: Some("ResourceGroupNotFound".to_string()),
//!     message: "Resource group 'x' could not be found.".to_string(),
//! };
//! assert!(err.is_not_found());
//! assert_eq!(err.kind(), ErrorKind::RemoteRequestFailure);
//! ```

use crate::config::ConfigError;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing credentials or an unusable config file
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The identity endpoint rejected the service principal
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Management API returned a non-success status
    #[error("HTTP {status}{}: {message}", code_prefix(.code))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Transport-level failure (DNS, TLS, connection reset, body decode)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Long-running operation reached a terminal failure state
    #[error("Operation {status}{}: {message}", code_prefix(.code))]
    OperationFailed {
        status: String,
        code: Option<String>,
        message: String,
    },

    /// The task driving a pending operation went away without a result
    #[error("Operation was abandoned before it completed")]
    OperationAbandoned,

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn code_prefix(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Coarse error categories reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required environment variable is absent
    EnvironmentMissing,
    /// Token acquisition failed
    AuthenticationFailure,
    /// Group or server creation failed, including a failed operation
    RemoteRequestFailure,
    /// Config file or endpoint settings are unusable
    Configuration,
}

impl CoreError {
    /// Category of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Config(ConfigError::MissingEnvVar { .. }) => ErrorKind::EnvironmentMissing,
            CoreError::Config(_) => ErrorKind::Configuration,
            CoreError::Authentication { .. } => ErrorKind::AuthenticationFailure,
            _ => ErrorKind::RemoteRequestFailure,
        }
    }

    /// HTTP status of an API error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::Api { status, .. } => Some(*status),
            CoreError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Authentication { .. })
            || matches!(self.status(), Some(401) | Some(403))
    }

    /// Returns true if this is a conflict error (409)
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Returns true if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_var_kind() {
        let err: CoreError = ConfigError::MissingEnvVar {
            var: "AZURE_TENANT_ID",
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::EnvironmentMissing);
        assert!(err.to_string().contains("AZURE_TENANT_ID"));
    }

    #[test]
    fn test_config_error_kind() {
        let err: CoreError = ConfigError::ConfigDirError.into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_authentication_kind() {
        let err = CoreError::Authentication {
            message: "AADSTS7000215: Invalid client secret provided.".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_api_error_helpers() {
        let forbidden = CoreError::Api {
            status: 403,
            code: Some("AuthorizationFailed".to_string()),
            message: "no access".to_string(),
        };
        assert!(forbidden.is_unauthorized());
        assert!(!forbidden.is_server_error());
        assert_eq!(forbidden.kind(), ErrorKind::RemoteRequestFailure);

        let conflict = CoreError::Api {
            status: 409,
            code: None,
            message: "busy".to_string(),
        };
        assert!(conflict.is_conflict());

        let unavailable = CoreError::Api {
            status: 503,
            code: None,
            message: "try later".to_string(),
        };
        assert!(unavailable.is_server_error());
    }

    #[test]
    fn test_display_includes_code() {
        let err = CoreError::Api {
            status: 400,
            code: Some("InvalidParameter".to_string()),
            message: "storageMB is invalid".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 400 (InvalidParameter): storageMB is invalid"
        );

        let failed = CoreError::OperationFailed {
            status: "Failed".to_string(),
            code: None,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(failed.to_string(), "Operation Failed: quota exceeded");
        assert_eq!(failed.kind(), ErrorKind::RemoteRequestFailure);
    }

    #[test]
    fn test_abandoned_is_remote_failure() {
        assert_eq!(
            CoreError::OperationAbandoned.kind(),
            ErrorKind::RemoteRequestFailure
        );
    }
}
