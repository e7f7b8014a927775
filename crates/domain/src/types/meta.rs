//! Per-tenant Meta application configuration.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SocialHubError};

/// Graph API version used when a tenant has no explicit configuration.
pub const DEFAULT_GRAPH_VERSION: &str = "v25.0";

/// OAuth scopes requested when a tenant has no explicit configuration.
pub const DEFAULT_SCOPES: &str = "pages_show_list,pages_read_engagement,pages_manage_posts,\
instagram_basic,instagram_content_publish,business_management";

/// Meta app credentials and API settings for one tenant.
///
/// A missing configuration record yields [`MetaAppConfig::empty`]: safe
/// defaults with blank credentials, never an error at lookup time. Operations
/// that actually need credentials call [`MetaAppConfig::require_credentials`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaAppConfig {
    pub app_id: String,
    pub app_secret: String,
    pub graph_version: String,
    pub scopes: String,
}

impl MetaAppConfig {
    /// Defaults with blank credentials, returned when no record exists.
    pub fn empty() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            graph_version: DEFAULT_GRAPH_VERSION.to_string(),
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }

    /// Versioned Graph API base URL.
    pub fn graph_base(&self) -> String {
        format!("https://graph.facebook.com/{}", self.graph_version)
    }

    /// OAuth dialog base URL.
    pub fn dialog_base(&self) -> String {
        format!("https://www.facebook.com/{}/dialog/oauth", self.graph_version)
    }

    /// Fail with a configuration error unless app id and secret are present.
    pub fn require_credentials(&self) -> Result<()> {
        if self.app_id.is_empty() || self.app_secret.is_empty() {
            return Err(SocialHubError::Config(
                "Meta app id / app secret are required in settings".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MetaAppConfig {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_has_safe_defaults() {
        let config = MetaAppConfig::empty();
        assert_eq!(config.graph_version, "v25.0");
        assert!(config.scopes.contains("pages_manage_posts"));
        assert!(config.scopes.contains("instagram_content_publish"));
        assert!(config.app_id.is_empty());
    }

    #[test]
    fn graph_base_includes_version() {
        let mut config = MetaAppConfig::empty();
        config.graph_version = "v26.0".into();
        assert_eq!(config.graph_base(), "https://graph.facebook.com/v26.0");
        assert_eq!(
            config.dialog_base(),
            "https://www.facebook.com/v26.0/dialog/oauth"
        );
    }

    #[test]
    fn require_credentials_rejects_blank_fields() {
        let mut config = MetaAppConfig::empty();
        assert!(config.require_credentials().is_err());
        config.app_id = "app".into();
        assert!(config.require_credentials().is_err());
        config.app_secret = "secret".into();
        assert!(config.require_credentials().is_ok());
    }
}
