//! SQLite-backed implementation of the tenant app configuration port.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;
use socialhub_core::AppConfigProvider;
use socialhub_domain::{MetaAppConfig, Result};
use tokio::task;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed per-tenant Meta app configuration.
pub struct SqliteMetaConfigRepository {
    db: Arc<DbManager>,
}

impl SqliteMetaConfigRepository {
    /// Construct a repository backed by the shared manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Create or replace a tenant's configuration.
    pub async fn upsert(&self, tenant_id: &str, config: &MetaAppConfig) -> Result<()> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let config = config.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT OR REPLACE INTO meta_config (tenant_id, app_id, app_secret, graph_version, scopes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    tenant_id,
                    config.app_id,
                    config.app_secret,
                    config.graph_version,
                    config.scopes,
                ],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(InfraError::from)?
    }
}

#[async_trait]
impl AppConfigProvider for SqliteMetaConfigRepository {
    async fn meta_config(&self, tenant_id: &str) -> Result<MetaAppConfig> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();

        task::spawn_blocking(move || -> Result<MetaAppConfig> {
            let conn = db.get_connection()?;
            let result = conn.query_row(
                "SELECT app_id, app_secret, graph_version, scopes FROM meta_config WHERE tenant_id = ?1",
                params![tenant_id],
                |row| {
                    Ok(MetaAppConfig {
                        app_id: row.get(0)?,
                        app_secret: row.get(1)?,
                        graph_version: row.get(2)?,
                        scopes: row.get(3)?,
                    })
                },
            );
            match result {
                Ok(config) => Ok(config),
                // Missing configuration is a normal pre-setup condition
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(MetaAppConfig::empty()),
                Err(other) => Err(InfraError::from(other).into()),
            }
        })
        .await
        .map_err(InfraError::from)?
    }
}
