//! Reqwest-backed implementation of the Graph API port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use socialhub_core::{CallClass, GraphApi, GraphMethod};
use socialhub_domain::{MetaAppConfig, Result, SocialHubError};
use tracing::debug;

use crate::errors::InfraError;

/// Connect timeout shared by every call class.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for metadata reads (token endpoints, page listings, permalinks).
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for feed and publish writes.
const FEED_TIMEOUT: Duration = Duration::from_secs(45);
/// Timeout for media container and video uploads.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the versioned Graph API.
///
/// One call per invocation: no retry, no backoff. The publish engine owns
/// retry policy, and authorization codes must never be re-sent.
pub struct GraphClient {
    http: Client,
    base_url: String,
}

impl GraphClient {
    /// Create a client for the configured Graph API version.
    pub fn new(config: &MetaAppConfig) -> Result<Self> {
        Self::with_base_url(config.graph_base())
    }

    /// Create a client against an explicit base URL. Used by tests to point
    /// at a local mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|err| SocialHubError::Internal(format!("HTTP client: {err}")))?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    fn timeout_for(class: CallClass) -> Duration {
        match class {
            CallClass::Metadata => METADATA_TIMEOUT,
            CallClass::Feed => FEED_TIMEOUT,
            CallClass::Upload => UPLOAD_TIMEOUT,
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl GraphApi for GraphClient {
    async fn call(
        &self,
        method: GraphMethod,
        path: &str,
        params: &[(String, String)],
        class: CallClass,
    ) -> Result<Value> {
        let url = self.url_for(path);
        let timeout = Self::timeout_for(class);
        debug!(%url, ?method, ?class, "graph call");

        let request = match method {
            GraphMethod::Get => self.http.get(&url).query(params),
            GraphMethod::Post => self.http.post(&url).form(params),
        };

        let response =
            request.timeout(timeout).send().await.map_err(InfraError::from)?;
        let status = response.status();
        let text = response.text().await.map_err(InfraError::from)?;

        into_payload(status, text)
    }
}

/// Decode a Graph API response body.
///
/// The API reports failures both as non-2xx statuses and as 2xx bodies with
/// an embedded `error` object; either form becomes a `Provider` error
/// carrying the raw payload.
fn into_payload(status: StatusCode, text: String) -> Result<Value> {
    let body: Option<Value> = serde_json::from_str(&text).ok();

    if !status.is_success() {
        return Err(SocialHubError::Provider(text));
    }
    match body {
        Some(value) if value.get("error").is_some() => Err(SocialHubError::Provider(text)),
        Some(value) => Ok(value),
        None => Err(SocialHubError::Provider(format!("non-JSON response: {text}"))),
    }
}
