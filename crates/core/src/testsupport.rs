//! In-memory port implementations shared by the unit tests in this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use socialhub_domain::{Account, AccountState, MetaAppConfig, Result, SocialHubError};
use tokio::sync::Mutex;

use crate::connect::ports::{AccountStore, ActivityLog, AppConfigProvider};
use crate::provider::{CallClass, GraphApi, GraphMethod};
use crate::publish::ports::PublishJobStore;

/// One recorded Graph API call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: GraphMethod,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub class: CallClass,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Scripted Graph API double. Responses are queued per path and consumed in
/// order, so repeated calls to the same endpoint can differ.
#[derive(Default)]
pub struct MockGraph {
    responses: Mutex<HashMap<String, VecDeque<Result<Value>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stub(&self, path: &str, result: Result<Value>) {
        let mut map = self.responses.lock().await;
        map.entry(path.to_string()).or_default().push_back(result);
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().await.iter().filter(|call| call.path == path).count()
    }
}

#[async_trait]
impl GraphApi for MockGraph {
    async fn call(
        &self,
        method: GraphMethod,
        path: &str,
        params: &[(String, String)],
        class: CallClass,
    ) -> Result<Value> {
        self.calls.lock().await.push(RecordedCall {
            method,
            path: path.to_string(),
            params: params.to_vec(),
            class,
        });

        let mut map = self.responses.lock().await;
        if let Some(queue) = map.get_mut(path) {
            if let Some(result) = queue.pop_front() {
                return result;
            }
        }
        Err(SocialHubError::Internal(format!("no stubbed response for path {path}")))
    }
}

/// In-memory account store.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
    fail_save: Mutex<bool>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, account: Account) {
        self.accounts.lock().await.insert(account.id.clone(), account);
    }

    pub async fn fetch(&self, account_id: &str) -> Option<Account> {
        self.accounts.lock().await.get(account_id).cloned()
    }

    pub async fn set_fail_save(&self, fail: bool) {
        *self.fail_save.lock().await = fail;
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, tenant_id: &str, account_id: &str) -> Result<Account> {
        self.accounts
            .lock()
            .await
            .get(account_id)
            .filter(|account| account.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| SocialHubError::NotFound(format!("account {account_id}")))
    }

    async fn find_by_oauth_state(&self, state: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|account| account.oauth_state.as_deref() == Some(state))
            .cloned())
    }

    async fn save(&self, account: &Account) -> Result<()> {
        if *self.fail_save.lock().await {
            return Err(SocialHubError::Database("save failure".into()));
        }
        self.accounts.lock().await.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn list_refresh_candidates(&self) -> Result<Vec<Account>> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .filter(|account| {
                account.state == AccountState::Connected && account.user_access_token.is_some()
            })
            .cloned()
            .collect())
    }
}

/// In-memory publish job store.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, socialhub_domain::PublishJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: socialhub_domain::PublishJob) {
        self.jobs.lock().await.insert(job.id.clone(), job);
    }

    pub async fn fetch(&self, job_id: &str) -> Option<socialhub_domain::PublishJob> {
        self.jobs.lock().await.get(job_id).cloned()
    }
}

#[async_trait]
impl PublishJobStore for MemoryJobStore {
    async fn get(&self, tenant_id: &str, job_id: &str) -> Result<socialhub_domain::PublishJob> {
        self.jobs
            .lock()
            .await
            .get(job_id)
            .filter(|job| job.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| SocialHubError::NotFound(format!("publish job {job_id}")))
    }

    async fn save(&self, job: &socialhub_domain::PublishJob) -> Result<()> {
        self.jobs.lock().await.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn find_due(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        limit: usize,
    ) -> Result<Vec<socialhub_domain::PublishJob>> {
        use socialhub_domain::JobState;

        let jobs = self.jobs.lock().await;
        let mut due: Vec<_> = jobs
            .values()
            .filter(|job| job.state == JobState::Queued)
            .filter(|job| job.next_retry_at.map_or(true, |at| at <= now))
            .filter(|job| job.scheduled_at.map_or(true, |at| at <= now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.id.cmp(&b.id));
        due.truncate(limit);
        Ok(due)
    }
}

/// Activity trail double that records every message.
#[derive(Default)]
pub struct MemoryActivityLog {
    messages: Mutex<Vec<(String, String)>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages_for(&self, record_id: &str) -> Vec<String> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|(id, _)| id == record_id)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn record(&self, record_id: &str, message: &str) {
        self.messages.lock().await.push((record_id.to_string(), message.to_string()));
    }
}

/// Config provider returning one fixed configuration for every tenant.
pub struct StaticConfigProvider {
    config: MetaAppConfig,
}

impl StaticConfigProvider {
    pub fn new(config: MetaAppConfig) -> Self {
        Self { config }
    }

    pub fn with_credentials() -> Arc<Self> {
        let mut config = MetaAppConfig::empty();
        config.app_id = "app-id".into();
        config.app_secret = "app-secret".into();
        Arc::new(Self::new(config))
    }
}

#[async_trait]
impl AppConfigProvider for StaticConfigProvider {
    async fn meta_config(&self, _tenant_id: &str) -> Result<MetaAppConfig> {
        Ok(self.config.clone())
    }
}
