//! Resolution of the concrete publishable target behind a user token.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use socialhub_domain::{Account, PublishTarget, Result, SocialHubError, TargetKind};
use tracing::{debug, info, warn};

use crate::connect::ports::AccountStore;
use crate::provider::{params, CallClass, Enrichment, GraphApi};

/// Fields requested for each managed page, including any linked business
/// profile.
const PAGE_FIELDS: &str =
    "id,name,access_token,link,instagram_business_account{id,username,name,profile_picture_url}";

/// Result of a resolution: the normalized target descriptor plus whether the
/// supplemental profile detail fetch ran and what it yielded.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub target: PublishTarget,
    pub profile_enrichment: Enrichment,
}

/// Discovers the page or linked business profile to publish as, given a
/// valid user-scoped token, and writes the account to connected state.
pub struct AccountResolver {
    graph: Arc<dyn GraphApi>,
    accounts: Arc<dyn AccountStore>,
}

impl AccountResolver {
    /// Create a new resolver over the given ports.
    pub fn new(graph: Arc<dyn GraphApi>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { graph, accounts }
    }

    /// Resolve the publishable target for `account` using `user_token`.
    ///
    /// Ordered lookup protocol: identity first (fatal on failure), then the
    /// managed page list (fatal when empty). For page-kind accounts the
    /// first page in provider response order wins; that ordering is
    /// provider-defined and not guaranteed stable across calls. For
    /// business-profile accounts the first page exposing a linked profile
    /// wins.
    ///
    /// On success the account is written to connected with the descriptor
    /// and a sync timestamp.
    pub async fn resolve(&self, account: &mut Account, user_token: &str) -> Result<ResolvedTarget> {
        self.fetch_identity(user_token).await?;

        let pages = self.fetch_pages(user_token).await?;
        if pages.is_empty() {
            return Err(SocialHubError::NoTarget(
                "no pages available for this user token".into(),
            ));
        }

        let resolved = match account.kind {
            TargetKind::Page => self.resolve_page(account, user_token, &pages),
            TargetKind::BusinessProfile => {
                self.resolve_business_profile(account, user_token, &pages).await?
            }
        };

        account.apply_target(&resolved.target, Utc::now());
        self.accounts.save(account).await?;
        info!(
            account_id = %account.id,
            external_id = %resolved.target.external_id,
            kind = %resolved.target.kind,
            "publish target resolved"
        );
        Ok(resolved)
    }

    /// Fetch `/me`. Failure here is fatal: there are no pages to fall back
    /// to without an identity.
    async fn fetch_identity(&self, user_token: &str) -> Result<Value> {
        self.graph
            .get(
                "me",
                &params(&[("fields", "id,name"), ("access_token", user_token)]),
                CallClass::Metadata,
            )
            .await
            .map_err(|err| SocialHubError::Resolution(format!("identity fetch failed: {err}")))
    }

    async fn fetch_pages(&self, user_token: &str) -> Result<Vec<Value>> {
        let body = self
            .graph
            .get(
                "me/accounts",
                &params(&[("fields", PAGE_FIELDS), ("access_token", user_token)]),
                CallClass::Metadata,
            )
            .await
            .map_err(|err| SocialHubError::Resolution(format!("page list fetch failed: {err}")))?;

        Ok(body.get("data").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    fn resolve_page(
        &self,
        account: &Account,
        user_token: &str,
        pages: &[Value],
    ) -> ResolvedTarget {
        // First page in provider response order; known non-determinism when
        // several pages are accessible.
        let page = &pages[0];
        let page_id = str_field(page, "id").unwrap_or_default();
        let display_name = str_field(page, "name").unwrap_or_else(|| account.name.clone());
        let access_token = str_field(page, "access_token")
            .unwrap_or_else(|| user_token.to_string());
        let profile_url = str_field(page, "link").or_else(|| {
            (!page_id.is_empty()).then(|| format!("https://www.facebook.com/{page_id}"))
        });

        ResolvedTarget {
            target: PublishTarget {
                kind: TargetKind::Page,
                external_id: page_id,
                display_name,
                username: None,
                profile_url,
                access_token,
            },
            profile_enrichment: Enrichment::NotNeeded,
        }
    }

    async fn resolve_business_profile(
        &self,
        account: &Account,
        user_token: &str,
        pages: &[Value],
    ) -> Result<ResolvedTarget> {
        let Some((page, profile)) = pages.iter().find_map(|page| {
            page.get("instagram_business_account")
                .filter(|profile| !profile.is_null())
                .map(|profile| (page, profile.clone()))
        }) else {
            return Err(SocialHubError::NoTarget(
                "no business profile linked to any accessible page".into(),
            ));
        };

        let profile_id = str_field(&profile, "id").unwrap_or_default();
        let mut username = str_field(&profile, "username");
        let mut display_name = str_field(&profile, "name");
        let mut picture_url = str_field(&profile, "profile_picture_url");
        let page_token =
            str_field(page, "access_token").unwrap_or_else(|| user_token.to_string());

        // Supplemental detail fetch when the embedded profile is incomplete.
        // Best-effort: a failure keeps the original values.
        let mut enrichment = Enrichment::NotNeeded;
        if !profile_id.is_empty() && (username.is_none() || display_name.is_none()) {
            match self.fetch_profile_details(&profile_id, &page_token).await {
                Ok(details) => {
                    username = str_field(&details, "username").or(username);
                    display_name = str_field(&details, "name").or(display_name);
                    picture_url = str_field(&details, "profile_picture_url").or(picture_url);
                    enrichment = Enrichment::Fetched;
                }
                Err(err) => {
                    warn!(profile_id = %profile_id, error = %err, "profile detail fetch failed, keeping embedded values");
                    enrichment = Enrichment::FellBack;
                }
            }
        }

        let profile_url = username
            .as_ref()
            .map(|username| format!("https://www.instagram.com/{username}/"))
            .or(picture_url);
        let display_name = display_name
            .or_else(|| username.clone())
            .unwrap_or_else(|| account.name.clone());

        Ok(ResolvedTarget {
            target: PublishTarget {
                kind: TargetKind::BusinessProfile,
                external_id: profile_id,
                display_name,
                username,
                profile_url,
                access_token: page_token,
            },
            profile_enrichment: enrichment,
        })
    }

    async fn fetch_profile_details(&self, profile_id: &str, page_token: &str) -> Result<Value> {
        debug!(profile_id = %profile_id, "fetching business profile details");
        self.graph
            .get(
                profile_id,
                &params(&[
                    ("fields", "id,username,name,profile_picture_url"),
                    ("access_token", page_token),
                ]),
                CallClass::Metadata,
            )
            .await
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use socialhub_domain::AccountState;

    use super::*;
    use crate::testsupport::{MemoryAccountStore, MockGraph};

    fn resolver_with(
        graph: Arc<MockGraph>,
        accounts: Arc<MemoryAccountStore>,
    ) -> AccountResolver {
        AccountResolver::new(graph, accounts)
    }

    async fn stub_identity(graph: &MockGraph) {
        graph.stub("me", Ok(json!({"id": "U", "name": "User"}))).await;
    }

    fn page(id: &str, name: &str, token: &str) -> Value {
        json!({"id": id, "name": name, "access_token": token, "link": format!("https://www.facebook.com/{id}")})
    }

    #[tokio::test]
    async fn identity_failure_is_fatal() {
        let graph = Arc::new(MockGraph::new());
        graph
            .stub("me", Err(SocialHubError::Provider(r#"{"error":{"code":190}}"#.into())))
            .await;
        let accounts = Arc::new(MemoryAccountStore::new());
        let resolver = resolver_with(graph.clone(), accounts);

        let mut account = Account::new("t", "Brand", "@brand", TargetKind::Page);
        let err = resolver.resolve(&mut account, "U1").await.expect_err("should fail");
        assert!(matches!(err, SocialHubError::Resolution(_)));
        assert!(err.to_string().contains("190"));
        // No fallback to the page list
        assert_eq!(graph.calls_to("me/accounts").await, 0);
    }

    #[tokio::test]
    async fn empty_page_list_is_no_target() {
        let graph = Arc::new(MockGraph::new());
        stub_identity(&graph).await;
        graph.stub("me/accounts", Ok(json!({"data": []}))).await;
        let resolver = resolver_with(graph, Arc::new(MemoryAccountStore::new()));

        let mut account = Account::new("t", "Brand", "@brand", TargetKind::Page);
        let err = resolver.resolve(&mut account, "U1").await.expect_err("should fail");
        assert!(matches!(err, SocialHubError::NoTarget(_)));
        assert_eq!(account.state, AccountState::Draft);
    }

    #[tokio::test]
    async fn page_kind_takes_first_page_in_provider_order() {
        let graph = Arc::new(MockGraph::new());
        stub_identity(&graph).await;
        graph
            .stub(
                "me/accounts",
                Ok(json!({"data": [page("P1", "Brand", "PT1"), page("P2", "Other", "PT2")]})),
            )
            .await;
        let accounts = Arc::new(MemoryAccountStore::new());
        let resolver = resolver_with(graph, accounts.clone());

        let mut account = Account::new("t", "Old Name", "@brand", TargetKind::Page);
        accounts.insert(account.clone()).await;
        let resolved = resolver.resolve(&mut account, "U1").await.expect("should resolve");

        assert_eq!(resolved.target.external_id, "P1");
        assert_eq!(resolved.target.access_token, "PT1");
        assert_eq!(resolved.profile_enrichment, Enrichment::NotNeeded);

        assert_eq!(account.state, AccountState::Connected);
        assert_eq!(account.external_uid.as_deref(), Some("P1"));
        assert_eq!(account.access_token.as_deref(), Some("PT1"));
        assert_eq!(account.name, "Brand");
        assert!(account.last_sync_at.is_some());

        let stored = accounts.fetch(&account.id).await.expect("stored");
        assert_eq!(stored.state, AccountState::Connected);
    }

    #[tokio::test]
    async fn page_without_own_token_falls_back_to_user_token() {
        let graph = Arc::new(MockGraph::new());
        stub_identity(&graph).await;
        graph
            .stub("me/accounts", Ok(json!({"data": [{"id": "P1", "name": "Brand"}]})))
            .await;
        let accounts = Arc::new(MemoryAccountStore::new());
        let resolver = resolver_with(graph, accounts);

        let mut account = Account::new("t", "Brand", "@brand", TargetKind::Page);
        let resolved = resolver.resolve(&mut account, "U1").await.expect("should resolve");
        assert_eq!(resolved.target.access_token, "U1");
        assert_eq!(
            resolved.target.profile_url.as_deref(),
            Some("https://www.facebook.com/P1")
        );
    }

    #[tokio::test]
    async fn business_profile_requires_a_linked_page() {
        let graph = Arc::new(MockGraph::new());
        stub_identity(&graph).await;
        graph
            .stub("me/accounts", Ok(json!({"data": [page("P1", "Brand", "PT1")]})))
            .await;
        let resolver = resolver_with(graph, Arc::new(MemoryAccountStore::new()));

        let mut account = Account::new("t", "Brand", "@brand", TargetKind::BusinessProfile);
        let err = resolver.resolve(&mut account, "U1").await.expect_err("should fail");
        assert!(matches!(err, SocialHubError::NoTarget(_)));
    }

    #[tokio::test]
    async fn business_profile_scans_pages_in_order() {
        let graph = Arc::new(MockGraph::new());
        stub_identity(&graph).await;
        graph
            .stub(
                "me/accounts",
                Ok(json!({"data": [
                    page("P1", "No IG", "PT1"),
                    {"id": "P2", "name": "Has IG", "access_token": "PT2",
                     "instagram_business_account": {"id": "IG1", "username": "brand_ig", "name": "Brand IG"}},
                ]})),
            )
            .await;
        let accounts = Arc::new(MemoryAccountStore::new());
        let resolver = resolver_with(graph.clone(), accounts);

        let mut account = Account::new("t", "Brand", "@brand", TargetKind::BusinessProfile);
        let resolved = resolver.resolve(&mut account, "U1").await.expect("should resolve");

        assert_eq!(resolved.target.external_id, "IG1");
        assert_eq!(resolved.target.username.as_deref(), Some("brand_ig"));
        assert_eq!(resolved.target.access_token, "PT2");
        assert_eq!(
            resolved.target.profile_url.as_deref(),
            Some("https://www.instagram.com/brand_ig/")
        );
        // Embedded profile was complete: no supplemental fetch
        assert_eq!(resolved.profile_enrichment, Enrichment::NotNeeded);
        assert_eq!(graph.calls_to("IG1").await, 0);
        assert_eq!(account.handle, "brand_ig");
    }

    #[tokio::test]
    async fn incomplete_profile_triggers_supplemental_fetch() {
        let graph = Arc::new(MockGraph::new());
        stub_identity(&graph).await;
        graph
            .stub(
                "me/accounts",
                Ok(json!({"data": [
                    {"id": "P1", "name": "Page", "access_token": "PT1",
                     "instagram_business_account": {"id": "IG1"}},
                ]})),
            )
            .await;
        graph
            .stub(
                "IG1",
                Ok(json!({"id": "IG1", "username": "brand_ig", "name": "Brand IG"})),
            )
            .await;
        let resolver = resolver_with(graph.clone(), Arc::new(MemoryAccountStore::new()));

        let mut account = Account::new("t", "Brand", "@brand", TargetKind::BusinessProfile);
        let resolved = resolver.resolve(&mut account, "U1").await.expect("should resolve");

        assert_eq!(resolved.profile_enrichment, Enrichment::Fetched);
        assert_eq!(resolved.target.username.as_deref(), Some("brand_ig"));
        assert_eq!(resolved.target.display_name, "Brand IG");

        // The supplemental fetch used the owning page's token
        let calls = graph.calls().await;
        let detail_call = calls.iter().find(|call| call.path == "IG1").expect("detail call");
        assert_eq!(detail_call.param("access_token"), Some("PT1"));
    }

    #[tokio::test]
    async fn failed_supplemental_fetch_falls_back_to_embedded_values() {
        let graph = Arc::new(MockGraph::new());
        stub_identity(&graph).await;
        graph
            .stub(
                "me/accounts",
                Ok(json!({"data": [
                    {"id": "P1", "name": "Page", "access_token": "PT1",
                     "instagram_business_account": {"id": "IG1", "username": "brand_ig"}},
                ]})),
            )
            .await;
        graph
            .stub("IG1", Err(SocialHubError::Provider(r#"{"error":{"code":10}}"#.into())))
            .await;
        let resolver = resolver_with(graph, Arc::new(MemoryAccountStore::new()));

        let mut account = Account::new("t", "Brand", "@brand", TargetKind::BusinessProfile);
        let resolved = resolver.resolve(&mut account, "U1").await.expect("should resolve");

        // Primary operation still succeeds, observably degraded
        assert_eq!(resolved.profile_enrichment, Enrichment::FellBack);
        assert_eq!(resolved.target.username.as_deref(), Some("brand_ig"));
        assert_eq!(resolved.target.display_name, "brand_ig");
        assert_eq!(account.state, AccountState::Connected);
    }
}
