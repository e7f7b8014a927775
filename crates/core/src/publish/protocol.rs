//! Platform-specific publish protocols.
//!
//! One protocol per [`TargetKind`]: pages publish in a single feed or video
//! call, business profiles use the container-then-publish sequence. Both end
//! with a best-effort permalink lookup that never fails the publish itself.

use async_trait::async_trait;
use serde_json::Value;
use socialhub_domain::{MediaKind, PublishJob, Result, SocialHubError, TargetKind};
use tracing::{debug, warn};

use crate::provider::{params, CallClass, Enrichment, GraphApi};

/// A post accepted by the platform.
#[derive(Debug, Clone)]
pub struct ProviderPost {
    /// Provider-side post id.
    pub post_id: String,
    /// Public permalink, when the enrichment lookup supplied one.
    pub permalink: Option<String>,
    /// Whether the permalink came from a secondary fetch or fell back.
    pub permalink_enrichment: Enrichment,
    /// Raw payload of the call that created the post.
    pub raw: Value,
}

/// One platform's publish sequence.
#[async_trait]
pub trait PublishProtocol: Send + Sync {
    /// Publish the job's content to the target, returning the accepted post.
    async fn publish(
        &self,
        graph: &dyn GraphApi,
        target_id: &str,
        token: &str,
        job: &PublishJob,
    ) -> Result<ProviderPost>;
}

/// Select the protocol for a target kind.
pub fn protocol_for(kind: TargetKind) -> &'static dyn PublishProtocol {
    match kind {
        TargetKind::Page => &PageFeedProtocol,
        TargetKind::BusinessProfile => &BusinessProfileProtocol,
    }
}

/// Facebook Page publishing: feed posts for text and images, a dedicated
/// video endpoint for video.
pub struct PageFeedProtocol;

#[async_trait]
impl PublishProtocol for PageFeedProtocol {
    async fn publish(
        &self,
        graph: &dyn GraphApi,
        target_id: &str,
        token: &str,
        job: &PublishJob,
    ) -> Result<ProviderPost> {
        let body = match job.media_kind {
            MediaKind::Video => {
                let file_url = require_media_url(job)?;
                graph
                    .post(
                        &format!("{target_id}/videos"),
                        &params(&[
                            ("file_url", file_url),
                            ("description", &job.message),
                            ("access_token", token),
                        ]),
                        CallClass::Upload,
                    )
                    .await?
            }
            MediaKind::Image => {
                let link = require_media_url(job)?;
                graph
                    .post(
                        &format!("{target_id}/feed"),
                        &params(&[
                            ("message", &job.message),
                            ("link", link),
                            ("access_token", token),
                        ]),
                        CallClass::Feed,
                    )
                    .await?
            }
            MediaKind::Text => {
                graph
                    .post(
                        &format!("{target_id}/feed"),
                        &params(&[("message", &job.message), ("access_token", token)]),
                        CallClass::Feed,
                    )
                    .await?
            }
        };

        let post_id = require_post_id(&body)?;
        let (permalink, enrichment) =
            fetch_permalink(graph, &post_id, token, "permalink_url").await;
        Ok(ProviderPost { post_id, permalink, permalink_enrichment: enrichment, raw: body })
    }
}

/// Instagram business profile publishing: create a media container, then
/// publish it. Text-only content has no representation on this platform.
pub struct BusinessProfileProtocol;

#[async_trait]
impl PublishProtocol for BusinessProfileProtocol {
    async fn publish(
        &self,
        graph: &dyn GraphApi,
        target_id: &str,
        token: &str,
        job: &PublishJob,
    ) -> Result<ProviderPost> {
        let media_url = match job.media_kind {
            MediaKind::Text => {
                return Err(SocialHubError::Validation(
                    "business profile posts require an image or video".into(),
                ));
            }
            MediaKind::Image | MediaKind::Video => require_media_url(job)?,
        };

        let container_params = match job.media_kind {
            MediaKind::Image => params(&[
                ("caption", &job.message),
                ("image_url", media_url),
                ("access_token", token),
            ]),
            // Feed video publishing on this surface only accepts reels
            _ => params(&[
                ("caption", &job.message),
                ("video_url", media_url),
                ("media_type", "REELS"),
                ("access_token", token),
            ]),
        };
        let container = graph
            .post(&format!("{target_id}/media"), &container_params, CallClass::Upload)
            .await?;
        let container_id = require_post_id(&container)?;
        debug!(container_id = %container_id, "media container created");

        let body = graph
            .post(
                &format!("{target_id}/media_publish"),
                &params(&[("creation_id", &container_id), ("access_token", token)]),
                CallClass::Feed,
            )
            .await?;

        let post_id = require_post_id(&body)?;
        let (permalink, enrichment) = fetch_permalink(graph, &post_id, token, "permalink").await;
        Ok(ProviderPost { post_id, permalink, permalink_enrichment: enrichment, raw: body })
    }
}

fn require_media_url(job: &PublishJob) -> Result<&str> {
    job.media_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            SocialHubError::Validation(format!("{} post has no media URL", job.media_kind))
        })
}

fn require_post_id(body: &Value) -> Result<String> {
    body.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SocialHubError::Provider(format!("response has no post id: {body}")))
}

/// Look up the post's permalink. Best-effort: the post exists either way.
async fn fetch_permalink(
    graph: &dyn GraphApi,
    post_id: &str,
    token: &str,
    field: &str,
) -> (Option<String>, Enrichment) {
    let result = graph
        .get(
            post_id,
            &params(&[("fields", &format!("id,{field}")), ("access_token", token)]),
            CallClass::Metadata,
        )
        .await;

    match result {
        Ok(body) => match body.get(field).and_then(Value::as_str) {
            Some(link) if !link.is_empty() => (Some(link.to_string()), Enrichment::Fetched),
            _ => (None, Enrichment::FellBack),
        },
        Err(err) => {
            warn!(post_id, error = %err, "permalink lookup failed");
            (None, Enrichment::FellBack)
        }
    }
}
