//! Service principal authentication
//!
//! Uses the Azure AD v1 token endpoint with the client-credentials grant.
//! The resulting bearer token is attached to every management request.

use crate::config::Credentials;
use crate::error::{CoreError, Result};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info};

/// Audience requested for Azure Resource Manager tokens
pub const MANAGEMENT_RESOURCE: &str = "https://management.core.windows.net/";

/// Access token for the management API
#[derive(Clone)]
pub struct BearerToken {
    access_token: String,
}

impl BearerToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange the service principal credentials for a bearer token
///
/// Every failure, including an unreachable identity endpoint, is reported
/// as [`CoreError::Authentication`].
pub async fn acquire_token(
    http: &reqwest::Client,
    authority: &url::Url,
    credentials: &Credentials,
) -> Result<BearerToken> {
    let token_url = format!(
        "{}/{}/oauth2/token",
        authority.as_str().trim_end_matches('/'),
        credentials.tenant_id
    );
    debug!("Requesting token from {}", token_url);

    let body = serde_urlencoded::to_string([
        ("grant_type", "client_credentials"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("resource", MANAGEMENT_RESOURCE),
    ])
    .map_err(|e| CoreError::Authentication {
        message: format!("Failed to encode token request: {}", e),
    })?;

    let response = http
        .post(&token_url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
        .map_err(|e| CoreError::Authentication {
            message: format!("Token request failed: {}", e),
        })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| CoreError::Authentication {
        message: format!("Failed to read token response: {}", e),
    })?;

    if !status.is_success() {
        let message = match serde_json::from_str::<TokenErrorResponse>(&text) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{}: {}", err.error, description),
                None => err.error,
            },
            Err(_) => format!("HTTP {}: {}", status.as_u16(), text.trim()),
        };
        return Err(CoreError::Authentication { message });
    }

    let token: TokenResponse =
        serde_json::from_str(&text).map_err(|e| CoreError::Authentication {
            message: format!("Malformed token response: {}", e),
        })?;

    if let Some(token_type) = &token.token_type
        && !token_type.eq_ignore_ascii_case("bearer")
    {
        return Err(CoreError::Authentication {
            message: format!("Unsupported token type '{}'", token_type),
        });
    }

    info!("Acquired management token for client {}", credentials.client_id);
    Ok(BearerToken::new(token.access_token))
}
