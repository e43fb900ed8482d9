use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::{
    repo::{
        accounts::SeaOrmAccountsRepo,
        groups::{GroupsRepo, SeaOrmGroupsRepo},
        proxies::{ProxiesRepo, SeaOrmProxiesRepo},
        tags::{SeaOrmTagsRepo, TagsRepo},
    },
    service::{
        accounts::{AccountsService, AccountsServiceImpl},
        config::{ConfigService, ConfigServiceImpl},
        proxy_check::{HttpProxyProber, ProxyCheckService, ProxyCheckServiceImpl},
    },
};

pub trait DatabaseClient: Send + Sync {
    fn conn(&self) -> &DatabaseConnection;
}

pub struct SeaOrmDatabaseClient {
    conn: DatabaseConnection,
}

impl SeaOrmDatabaseClient {
    pub async fn new() -> Self {
        let conn = crate::db::connect()
            .await
            .expect("database connection failed");
        crate::schema::apply(&conn)
            .await
            .expect("schema apply failed");
        Self { conn }
    }
}

impl DatabaseClient for SeaOrmDatabaseClient {
    fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}

pub struct AppState {
    proxies_repo: Arc<dyn ProxiesRepo>,
    groups_repo: Arc<dyn GroupsRepo>,
    tags_repo: Arc<dyn TagsRepo>,
    accounts: Arc<dyn AccountsService>,
    proxy_check: Arc<dyn ProxyCheckService>,
    config: Arc<dyn ConfigService>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Arc::new(ConfigServiceImpl::new());
        let db: Arc<dyn DatabaseClient> = Arc::new(SeaOrmDatabaseClient::new().await);

        let accounts_repo = Arc::new(SeaOrmAccountsRepo::new(db.clone()));
        let proxies_repo = Arc::new(SeaOrmProxiesRepo::new(db.clone()));
        let groups_repo = Arc::new(SeaOrmGroupsRepo::new(db.clone()));
        let tags_repo = Arc::new(SeaOrmTagsRepo::new(db.clone()));

        let accounts = Arc::new(AccountsServiceImpl::new(
            db,
            accounts_repo,
            proxies_repo.clone(),
            groups_repo.clone(),
        ));

        let values = config.values();
        let prober = Arc::new(HttpProxyProber::new(
            values.probe_url.clone(),
            values.probe_timeout,
        ));
        let proxy_check = Arc::new(ProxyCheckServiceImpl::new(
            proxies_repo.clone(),
            prober,
            values.check_concurrency,
        ));

        Arc::new(Self {
            proxies_repo,
            groups_repo,
            tags_repo,
            accounts,
            proxy_check,
            config,
        })
    }

    pub fn accounts(&self) -> &dyn AccountsService {
        self.accounts.as_ref()
    }

    pub fn proxies_repo(&self) -> &dyn ProxiesRepo {
        self.proxies_repo.as_ref()
    }

    pub fn groups_repo(&self) -> &dyn GroupsRepo {
        self.groups_repo.as_ref()
    }

    pub fn tags_repo(&self) -> &dyn TagsRepo {
        self.tags_repo.as_ref()
    }

    pub fn proxy_check(&self) -> &dyn ProxyCheckService {
        self.proxy_check.as_ref()
    }

    pub fn config(&self) -> &dyn ConfigService {
        self.config.as_ref()
    }
}
