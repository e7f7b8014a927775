//! SQLite-backed implementation of the account store port.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Row};
use socialhub_core::AccountStore;
use socialhub_domain::{Account, AccountState, Result, SocialHubError, TargetKind};
use tokio::task;

use super::manager::DbManager;
use super::{from_epoch, parse_or_default, to_epoch};
use crate::errors::InfraError;

const ACCOUNT_COLUMNS: &str = "id, tenant_id, name, handle, kind, external_uid, profile_url, \
     access_token, token_expires_at, user_access_token, user_token_expires_at, last_refresh_at, \
     state, oauth_provider, oauth_state, oauth_state_expires_at, note, last_sync_at";

/// SQLite-backed account repository.
pub struct SqliteAccountRepository {
    db: Arc<DbManager>,
}

impl SqliteAccountRepository {
    /// Construct a repository backed by the shared manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for SqliteAccountRepository {
    async fn get(&self, tenant_id: &str, account_id: &str) -> Result<Account> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let account_id = account_id.to_string();

        task::spawn_blocking(move || -> Result<Account> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1 AND tenant_id = ?2"
            );
            conn.query_row(&sql, params![account_id, tenant_id], map_account_row)
                .map_err(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => {
                        SocialHubError::NotFound(format!("account {account_id}"))
                    }
                    other => InfraError::from(other).into(),
                })
        })
        .await
        .map_err(InfraError::from)?
    }

    async fn find_by_oauth_state(&self, state: &str) -> Result<Option<Account>> {
        let db = Arc::clone(&self.db);
        let state = state.to_string();

        task::spawn_blocking(move || -> Result<Option<Account>> {
            let conn = db.get_connection()?;
            let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE oauth_state = ?1");
            match conn.query_row(&sql, params![state], map_account_row) {
                Ok(account) => Ok(Some(account)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(other) => Err(InfraError::from(other).into()),
            }
        })
        .await
        .map_err(InfraError::from)?
    }

    async fn save(&self, account: &Account) -> Result<()> {
        let db = Arc::clone(&self.db);
        let account = account.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT OR REPLACE INTO accounts (
                    id, tenant_id, name, handle, kind, external_uid, profile_url,
                    access_token, token_expires_at, user_access_token, user_token_expires_at,
                    last_refresh_at, state, oauth_provider, oauth_state, oauth_state_expires_at,
                    note, last_sync_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    account.id,
                    account.tenant_id,
                    account.name,
                    account.handle,
                    account.kind.to_string(),
                    account.external_uid,
                    account.profile_url,
                    account.access_token,
                    to_epoch(account.token_expires_at),
                    account.user_access_token,
                    to_epoch(account.user_token_expires_at),
                    to_epoch(account.last_refresh_at),
                    account.state.to_string(),
                    account.oauth_provider,
                    account.oauth_state,
                    to_epoch(account.oauth_state_expires_at),
                    account.note,
                    to_epoch(account.last_sync_at),
                ],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(InfraError::from)?
    }

    async fn list_refresh_candidates(&self) -> Result<Vec<Account>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<Account>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts \
                 WHERE state = 'connected' AND user_access_token IS NOT NULL \
                 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
            let rows = stmt
                .query_map([], map_account_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(rows)
        })
        .await
        .map_err(InfraError::from)?
    }
}

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let id: String = row.get(0)?;
    let kind_raw: String = row.get(4)?;
    let state_raw: String = row.get(12)?;

    Ok(Account {
        kind: parse_or_default(&id, "kind", &kind_raw, TargetKind::Page),
        state: parse_or_default(&id, "state", &state_raw, AccountState::Draft),
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        handle: row.get(3)?,
        external_uid: row.get(5)?,
        profile_url: row.get(6)?,
        access_token: row.get(7)?,
        token_expires_at: from_epoch(row.get(8)?),
        user_access_token: row.get(9)?,
        user_token_expires_at: from_epoch(row.get(10)?),
        last_refresh_at: from_epoch(row.get(11)?),
        oauth_provider: row.get(13)?,
        oauth_state: row.get(14)?,
        oauth_state_expires_at: from_epoch(row.get(15)?),
        note: row.get(16)?,
        last_sync_at: from_epoch(row.get(17)?),
        id,
    })
}
