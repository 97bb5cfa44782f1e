//! Authenticated Azure Resource Manager HTTP client
//!
//! A thin layer over `reqwest` that builds subscription-scoped URLs,
//! attaches the bearer token, and turns ARM error envelopes into
//! [`CoreError::Api`].

use crate::auth::BearerToken;
use crate::config::ConfigError;
use crate::error::{CoreError, Result};
use reqwest::header::{AUTHORIZATION, HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// User agent string for pgprovision HTTP requests
pub const USER_AGENT: &str = concat!("pgprovision/", env!("CARGO_PKG_VERSION"));

/// Header carrying the operation status URL on asynchronous ARM requests
pub const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Build the shared HTTP client
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

/// Subscription-scoped management client
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct ArmClient {
    http: reqwest::Client,
    base_url: url::Url,
    subscription_id: String,
    token: BearerToken,
}

/// Response from a management request that completed with a 2xx status
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub async_operation: Option<String>,
    pub location: Option<String>,
    pub retry_after: Option<Duration>,
    pub body: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

/// ARM `error` object, also used inside operation status bodies
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ArmClient {
    pub fn new(
        http: reqwest::Client,
        base_url: url::Url,
        subscription_id: impl Into<String>,
        token: BearerToken,
    ) -> Self {
        Self {
            http,
            base_url,
            subscription_id: subscription_id.into(),
            token,
        }
    }

    /// URL for `/subscriptions/{id}/{segments...}?api-version=...`
    ///
    /// Segments are percent-encoded individually.
    pub fn subscription_url(&self, segments: &[&str], api_version: &str) -> Result<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                CoreError::Config(ConfigError::InvalidEndpoint {
                    url: self.base_url.to_string(),
                    message: "cannot be used as a base URL".to_string(),
                })
            })?
            .pop_if_empty()
            .push("subscriptions")
            .push(&self.subscription_id)
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    pub async fn get(&self, url: &str) -> Result<ArmResponse> {
        self.send(Method::GET, url, None).await
    }

    pub async fn put_json<T: Serialize>(&self, url: &str, body: &T) -> Result<ArmResponse> {
        let body = serde_json::to_value(body)
            .map_err(|e| CoreError::InvalidResponse(format!("Failed to encode body: {}", e)))?;
        self.send(Method::PUT, url, Some(body)).await
    }

    pub async fn delete(&self, url: &str) -> Result<ArmResponse> {
        self.send(Method::DELETE, url, None).await
    }

    async fn send(&self, method: Method, url: &str, body: Option<Value>) -> Result<ArmResponse> {
        debug!("{} {}", method, url);
        if let Some(body) = &body {
            trace!("Request body: {}", redact(body));
        }

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, self.token.header_value());
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;
        debug!("{} {} -> {}", method, url, status.as_u16());
        trace!("Response body: {}", text);

        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                CoreError::InvalidResponse(format!("{} {} returned invalid JSON: {}", method, url, e))
            })?
        };

        Ok(ArmResponse {
            status,
            async_operation: header_string(&headers, AZURE_ASYNC_OPERATION),
            location: header_string(&headers, LOCATION.as_str()),
            retry_after: retry_after(&headers),
            body,
        })
    }
}

fn api_error(status: StatusCode, text: &str) -> CoreError {
    match serde_json::from_str::<ErrorEnvelope>(text) {
        Ok(envelope) => CoreError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
        },
        Err(_) => CoreError::Api {
            status: status.as_u16(),
            code: None,
            message: if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("").to_string()
            } else {
                text.trim().to_string()
            },
        },
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.is_empty())
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Mask password fields before the body reaches the logs
fn redact(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if k.to_ascii_lowercase().contains("password") {
                        (k.clone(), Value::String("***".to_string()))
                    } else {
                        (k.clone(), redact(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}
