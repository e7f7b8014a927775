use std::sync::Arc;

use socialhub_core::{
    AccountResolver, OAuthHandshakeManager, PublishEngine, TokenExchangeService, TokenMaintenance,
};
use socialhub_infra::{
    DbManager, GraphClient, SqliteAccountRepository, SqliteActivityLog,
    SqliteMetaConfigRepository, SqlitePublishJobRepository,
};
use tempfile::TempDir;

pub const REDIRECT_URI: &str = "https://app.example/oauth/callback";
pub const APP_BASE_URL: &str = "https://app.example";

/// Route log output through the test harness; repeat calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new migrated temporary database.
    pub fn new() -> Self {
        init_tracing();
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("test.db");

        let manager = Arc::new(DbManager::new(&db_path, 4).expect("db manager should be created"));
        manager.run_migrations().expect("migrations should run");

        Self { manager, _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// The full adapter stack wired against one database and one Graph base URL.
pub struct TestStack {
    pub accounts: Arc<SqliteAccountRepository>,
    pub jobs: Arc<SqlitePublishJobRepository>,
    pub configs: Arc<SqliteMetaConfigRepository>,
    pub activity: Arc<SqliteActivityLog>,
    pub handshakes: Arc<OAuthHandshakeManager>,
    pub maintenance: Arc<TokenMaintenance>,
    pub engine: Arc<PublishEngine>,
}

/// Wire repositories, services and the engine against a mock Graph server.
pub fn build_stack(db: &TestDatabase, graph_base_url: &str) -> TestStack {
    let accounts = Arc::new(SqliteAccountRepository::new(db.manager.clone()));
    let jobs = Arc::new(SqlitePublishJobRepository::new(db.manager.clone()));
    let configs = Arc::new(SqliteMetaConfigRepository::new(db.manager.clone()));
    let activity = Arc::new(SqliteActivityLog::new(db.manager.clone()));
    let graph = Arc::new(GraphClient::with_base_url(graph_base_url).expect("client built"));

    let tokens = Arc::new(TokenExchangeService::new(graph.clone(), accounts.clone()));
    let resolver = Arc::new(AccountResolver::new(graph.clone(), accounts.clone()));
    let handshakes = Arc::new(OAuthHandshakeManager::new(
        accounts.clone(),
        configs.clone(),
        activity.clone(),
        tokens.clone(),
        resolver.clone(),
        REDIRECT_URI,
    ));
    let maintenance = Arc::new(TokenMaintenance::new(
        accounts.clone(),
        configs.clone(),
        activity.clone(),
        tokens,
        resolver,
    ));
    let engine = Arc::new(PublishEngine::new(
        jobs.clone(),
        accounts.clone(),
        graph,
        activity.clone(),
    ));

    TestStack { accounts, jobs, configs, activity, handshakes, maintenance, engine }
}
