//! Port interface for the versioned Graph API.

use async_trait::async_trait;
use serde_json::Value;
use socialhub_domain::Result;

/// HTTP method of a Graph API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphMethod {
    Get,
    Post,
}

/// Call class, selecting the fixed request timeout.
///
/// Timeouts are per-class constants, not configurable per request: short
/// metadata reads, feed/publish writes, and large media uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    Metadata,
    Feed,
    Upload,
}

/// Outcome of a best-effort secondary fetch.
///
/// Permalink lookups and profile detail fetches must never fail the primary
/// operation, but tests need to observe whether the value was actually
/// fetched or the caller fell back to what it already had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    /// The secondary fetch succeeded and supplied the value.
    Fetched,
    /// The secondary fetch failed (fully or partially); original values kept.
    FellBack,
    /// No secondary fetch was necessary.
    NotNeeded,
}

/// Thin wrapper over the platform's versioned Graph API.
///
/// Implementations translate any non-2xx status, or a 2xx body containing an
/// embedded `error` object, into [`socialhub_domain::SocialHubError::Provider`]
/// carrying the raw payload. No retry happens at this layer; retry policy is
/// owned by the publish engine.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Perform one call against the versioned base URL.
    ///
    /// `params` are sent as query parameters for GET and as form fields for
    /// POST (access tokens included, as the Graph API expects).
    async fn call(
        &self,
        method: GraphMethod,
        path: &str,
        params: &[(String, String)],
        class: CallClass,
    ) -> Result<Value>;

    /// Convenience GET.
    async fn get(&self, path: &str, params: &[(String, String)], class: CallClass) -> Result<Value> {
        self.call(GraphMethod::Get, path, params, class).await
    }

    /// Convenience POST.
    async fn post(
        &self,
        path: &str,
        params: &[(String, String)],
        class: CallClass,
    ) -> Result<Value> {
        self.call(GraphMethod::Post, path, params, class).await
    }
}

/// Build an owned parameter list from string pairs.
pub(crate) fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}
