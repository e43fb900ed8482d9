use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::{
    entities::{enums::ProxyStatus, proxies},
    error::AppError,
    repo::proxies::ProxiesRepo,
};

/// Classification of a single probe. Every probe-time fault (timeout,
/// refused connection, TLS or DNS failure, non-200 status) lands on
/// `Invalid`; nothing escapes the prober except a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    Valid,
    Invalid,
}

/// Per-proxy result inside a batch. `error` is set only when persisting the
/// outcome failed, which is distinct from a network-invalid classification.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProxyOutcome {
    pub proxy_id: i64,
    pub status: ProxyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchReport {
    pub checked: u64,
    pub results: Vec<ProxyOutcome>,
}

/// Caller-side cancellation for a running batch: probes already in flight
/// run to completion, no new probes launch, persisted outcomes stand.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
pub trait ProxyProber: Send + Sync {
    /// Issue one probe through the proxy. `Err` is only ever a
    /// `Configuration` error from client construction.
    async fn probe(&self, proxy: &proxies::Model) -> Result<ProbeVerdict, AppError>;
}

/// Probes by fetching a fixed IP-echo endpoint through the proxy tunnel.
pub struct HttpProxyProber {
    probe_url: String,
    timeout: Duration,
}

impl HttpProxyProber {
    pub fn new(probe_url: String, timeout: Duration) -> Self {
        Self { probe_url, timeout }
    }

    /// Pure configuration: builds the tunneled client without any network
    /// I/O. Malformed host/port surface here, not at call time.
    fn client_for(&self, proxy: &proxies::Model) -> Result<reqwest::Client, AppError> {
        let tunnel = reqwest::Proxy::all(proxy.connection_url())
            .map_err(|err| AppError::Configuration(err.to_string()))?;
        reqwest::Client::builder()
            .proxy(tunnel)
            .timeout(self.timeout)
            .build()
            .map_err(|err| AppError::Configuration(err.to_string()))
    }
}

#[async_trait]
impl ProxyProber for HttpProxyProber {
    async fn probe(&self, proxy: &proxies::Model) -> Result<ProbeVerdict, AppError> {
        let client = self.client_for(proxy)?;
        match client.get(&self.probe_url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                Ok(ProbeVerdict::Valid)
            }
            Ok(_) => Ok(ProbeVerdict::Invalid),
            Err(_) => Ok(ProbeVerdict::Invalid),
        }
    }
}

#[async_trait]
pub trait ProxyCheckService: Send + Sync {
    /// Probe one proxy and persist its outcome.
    async fn check_one(&self, proxy_id: i64) -> Result<ProxyStatus, AppError>;
    /// Probe many proxies (all of them when `proxy_ids` is `None`) under the
    /// configured worker limit and persist each outcome independently.
    async fn check_batch(
        &self,
        proxy_ids: Option<Vec<i64>>,
        cancel: &CancelFlag,
    ) -> Result<BatchReport, AppError>;
}

pub struct ProxyCheckServiceImpl {
    proxies_repo: Arc<dyn ProxiesRepo>,
    prober: Arc<dyn ProxyProber>,
    concurrency: usize,
}

impl ProxyCheckServiceImpl {
    pub fn new(
        proxies_repo: Arc<dyn ProxiesRepo>,
        prober: Arc<dyn ProxyProber>,
        concurrency: usize,
    ) -> Self {
        Self {
            proxies_repo,
            prober,
            concurrency: concurrency.max(1),
        }
    }
}

/// Probe one proxy and persist the transition
/// `checking -> {valid, invalid}`. Never fails: a configuration error
/// becomes an invalid classification, a failed persistence write is carried
/// in the outcome.
async fn run_one(
    repo: &dyn ProxiesRepo,
    prober: &dyn ProxyProber,
    proxy: proxies::Model,
) -> ProxyOutcome {
    let proxy_id = proxy.id;

    if let Err(err) = repo.set_status(proxy_id, ProxyStatus::Checking, None).await {
        warn!(proxy_id, error = %err, "failed to mark proxy as checking");
    }

    let verdict = match prober.probe(&proxy).await {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!(proxy_id, error = %err, "proxy rejected at client construction");
            ProbeVerdict::Invalid
        }
    };
    let status = match verdict {
        ProbeVerdict::Valid => ProxyStatus::Valid,
        ProbeVerdict::Invalid => ProxyStatus::Invalid,
    };

    match repo
        .set_status(proxy_id, status, Some(Utc::now().into()))
        .await
    {
        Ok(()) => ProxyOutcome {
            proxy_id,
            status,
            error: None,
        },
        Err(err) => {
            error!(proxy_id, error = %err, "failed to persist proxy check outcome");
            ProxyOutcome {
                proxy_id,
                status,
                error: Some(err.to_string()),
            }
        }
    }
}

#[async_trait]
impl ProxyCheckService for ProxyCheckServiceImpl {
    async fn check_one(&self, proxy_id: i64) -> Result<ProxyStatus, AppError> {
        let Some(proxy) = self.proxies_repo.find_by_id(proxy_id).await? else {
            return Err(AppError::NotFound("proxy"));
        };
        let outcome = run_one(self.proxies_repo.as_ref(), self.prober.as_ref(), proxy).await;
        match outcome.error {
            None => Ok(outcome.status),
            Some(message) => Err(AppError::Persistence(sea_orm::DbErr::Custom(message))),
        }
    }

    async fn check_batch(
        &self,
        proxy_ids: Option<Vec<i64>>,
        cancel: &CancelFlag,
    ) -> Result<BatchReport, AppError> {
        let targets = match proxy_ids {
            Some(ids) => self.proxies_repo.find_by_ids(&ids).await?,
            None => self.proxies_repo.find_all().await?,
        };
        info!(
            targets = targets.len(),
            workers = self.concurrency,
            "starting proxy validation batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(targets.len());
        for proxy in targets {
            let semaphore = Arc::clone(&semaphore);
            let repo = Arc::clone(&self.proxies_repo);
            let prober = Arc::clone(&self.prober);
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return None;
                };
                if cancel.is_cancelled() {
                    return None;
                }
                Some(run_one(repo.as_ref(), prober.as_ref(), proxy).await)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Some(outcome)) => results.push(outcome),
                Ok(None) => {}
                Err(err) => error!(error = %err, "proxy check task failed"),
            }
        }

        info!(checked = results.len(), "proxy validation batch finished");
        Ok(BatchReport {
            checked: results.len() as u64,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entities::enums::ProxyKind,
        repo::proxies::SeaOrmProxiesRepo,
        schema,
        state::DatabaseClient,
    };
    use sea_orm::prelude::DateTimeWithTimeZone;
    use sea_orm::{ConnectOptions, Database, DatabaseTransaction, Set};
    use std::sync::atomic::AtomicUsize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct TestDatabaseClient {
        conn: sea_orm::DatabaseConnection,
    }

    impl DatabaseClient for TestDatabaseClient {
        fn conn(&self) -> &sea_orm::DatabaseConnection {
            &self.conn
        }
    }

    async fn memory_client() -> Arc<TestDatabaseClient> {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1);
        let conn = Database::connect(options).await.expect("sqlite connect");
        schema::apply(&conn).await.expect("schema apply");
        Arc::new(TestDatabaseClient { conn })
    }

    async fn insert_proxy(
        repo: &SeaOrmProxiesRepo,
        kind: ProxyKind,
        host: &str,
        port: i32,
    ) -> proxies::Model {
        repo.insert(proxies::ActiveModel {
            kind: Set(kind),
            host: Set(host.to_string()),
            port: Set(port),
            status: Set(ProxyStatus::Unchecked),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        })
        .await
        .expect("insert proxy")
    }

    struct StubProber {
        active: AtomicUsize,
        max_seen: AtomicUsize,
        verdict: ProbeVerdict,
        delay: Duration,
    }

    impl StubProber {
        fn new(verdict: ProbeVerdict, delay: Duration) -> Self {
            Self {
                active: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
                verdict,
                delay,
            }
        }
    }

    #[async_trait]
    impl ProxyProber for StubProber {
        async fn probe(&self, _proxy: &proxies::Model) -> Result<ProbeVerdict, AppError> {
            let in_flight = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(in_flight, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(self.verdict)
        }
    }

    /// One-shot listener that plays an HTTP proxy answering every request
    /// with the canned status line.
    async fn spawn_canned_proxy(response: &'static [u8]) -> i32 {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            }
        });
        i32::from(port)
    }

    async fn unused_loopback_port() -> i32 {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);
        i32::from(port)
    }

    #[tokio::test]
    async fn batch_respects_worker_limit_and_persists_outcomes() {
        let db = memory_client().await;
        let repo = Arc::new(SeaOrmProxiesRepo::new(db));
        for index in 0..12 {
            insert_proxy(&repo, ProxyKind::Socks5, &format!("10.0.0.{index}"), 1080).await;
        }

        let prober = Arc::new(StubProber::new(
            ProbeVerdict::Valid,
            Duration::from_millis(25),
        ));
        let service = ProxyCheckServiceImpl::new(repo.clone(), prober.clone(), 3);

        let report = service
            .check_batch(None, &CancelFlag::new())
            .await
            .expect("batch");

        assert_eq!(report.checked, 12);
        assert_eq!(report.results.len(), 12);
        assert!(report.results.iter().all(|outcome| outcome.error.is_none()));
        assert!(prober.max_seen.load(Ordering::SeqCst) <= 3);

        for proxy in repo.find_all().await.expect("list") {
            assert_eq!(proxy.status, ProxyStatus::Valid);
            assert!(proxy.last_checked_at.is_some());
        }
    }

    #[tokio::test]
    async fn cancelled_batch_launches_no_probes() {
        let db = memory_client().await;
        let repo = Arc::new(SeaOrmProxiesRepo::new(db));
        for index in 0..4 {
            insert_proxy(&repo, ProxyKind::Socks5, &format!("10.0.1.{index}"), 1080).await;
        }

        let prober = Arc::new(StubProber::new(ProbeVerdict::Valid, Duration::ZERO));
        let service = ProxyCheckServiceImpl::new(repo.clone(), prober, 2);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let report = service.check_batch(None, &cancel).await.expect("batch");

        assert_eq!(report.checked, 0);
        for proxy in repo.find_all().await.expect("list") {
            assert_eq!(proxy.status, ProxyStatus::Unchecked);
            assert!(proxy.last_checked_at.is_none());
        }
    }

    #[tokio::test]
    async fn refused_connection_classifies_invalid_and_is_idempotent() {
        let db = memory_client().await;
        let repo = Arc::new(SeaOrmProxiesRepo::new(db));
        let port = unused_loopback_port().await;
        let proxy = insert_proxy(&repo, ProxyKind::Socks5, "127.0.0.1", port).await;

        let prober = Arc::new(HttpProxyProber::new(
            "http://203.0.113.10".to_string(),
            Duration::from_secs(2),
        ));
        let service = ProxyCheckServiceImpl::new(repo.clone(), prober, 2);

        let report = service
            .check_batch(Some(vec![proxy.id]), &CancelFlag::new())
            .await
            .expect("batch");
        assert_eq!(report.checked, 1);

        let stored = repo.find_by_id(proxy.id).await.expect("get").expect("row");
        assert_eq!(stored.status, ProxyStatus::Invalid);
        assert!(stored.last_checked_at.is_some());

        let second = service
            .check_batch(Some(vec![proxy.id]), &CancelFlag::new())
            .await
            .expect("batch");
        assert_eq!(second.checked, 1);
        let stored = repo.find_by_id(proxy.id).await.expect("get").expect("row");
        assert_eq!(stored.status, ProxyStatus::Invalid);
    }

    #[tokio::test]
    async fn reachable_proxy_classifies_valid() {
        let db = memory_client().await;
        let repo = Arc::new(SeaOrmProxiesRepo::new(db));
        let port = spawn_canned_proxy(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n").await;
        let proxy = insert_proxy(&repo, ProxyKind::Http, "127.0.0.1", port).await;

        let prober = Arc::new(HttpProxyProber::new(
            "http://192.0.2.1/".to_string(),
            Duration::from_secs(2),
        ));
        let service = ProxyCheckServiceImpl::new(repo.clone(), prober, 2);

        let status = service.check_one(proxy.id).await.expect("check");
        assert_eq!(status, ProxyStatus::Valid);

        let stored = repo.find_by_id(proxy.id).await.expect("get").expect("row");
        assert_eq!(stored.status, ProxyStatus::Valid);
        assert!(stored.last_checked_at.is_some());
    }

    #[tokio::test]
    async fn non_200_probe_response_classifies_invalid() {
        let db = memory_client().await;
        let repo = Arc::new(SeaOrmProxiesRepo::new(db));
        let port = spawn_canned_proxy(
            b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n",
        )
        .await;
        let proxy = insert_proxy(&repo, ProxyKind::Http, "127.0.0.1", port).await;

        let prober = Arc::new(HttpProxyProber::new(
            "http://192.0.2.1/".to_string(),
            Duration::from_secs(2),
        ));
        let service = ProxyCheckServiceImpl::new(repo.clone(), prober, 2);

        let status = service.check_one(proxy.id).await.expect("check");
        assert_eq!(status, ProxyStatus::Invalid);
    }

    #[tokio::test]
    async fn stalled_probe_times_out_as_invalid() {
        let db = memory_client().await;
        let repo = Arc::new(SeaOrmProxiesRepo::new(db));

        // Accepts the connection and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = i32::from(listener.local_addr().expect("local addr").port());
        tokio::spawn(async move {
            if let Ok((_socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });
        let proxy = insert_proxy(&repo, ProxyKind::Http, "127.0.0.1", port).await;

        let prober = Arc::new(HttpProxyProber::new(
            "http://192.0.2.1/".to_string(),
            Duration::from_millis(200),
        ));
        let service = ProxyCheckServiceImpl::new(repo.clone(), prober, 2);

        let status = service.check_one(proxy.id).await.expect("check");
        assert_eq!(status, ProxyStatus::Invalid);
    }

    #[tokio::test]
    async fn malformed_proxy_is_configuration_error_and_invalid_in_batch() {
        let db = memory_client().await;
        let repo = Arc::new(SeaOrmProxiesRepo::new(db));
        let proxy = insert_proxy(&repo, ProxyKind::Socks5, "bad host", 1080).await;

        let prober = HttpProxyProber::new(
            "http://192.0.2.1/".to_string(),
            Duration::from_secs(1),
        );
        let err = prober.probe(&proxy).await.expect_err("construction error");
        assert!(matches!(err, AppError::Configuration(_)));

        // Inside a batch the same proxy is classified, not raised.
        let service = ProxyCheckServiceImpl::new(repo.clone(), Arc::new(prober), 2);
        let report = service
            .check_batch(Some(vec![proxy.id]), &CancelFlag::new())
            .await
            .expect("batch");
        assert_eq!(report.checked, 1);
        assert_eq!(report.results[0].status, ProxyStatus::Invalid);
        assert!(report.results[0].error.is_none());

        let stored = repo.find_by_id(proxy.id).await.expect("get").expect("row");
        assert_eq!(stored.status, ProxyStatus::Invalid);
    }

    /// Delegates to a real repo but fails the completion write, to exercise
    /// the per-proxy persistence error path.
    struct FailingWriteRepo {
        inner: Arc<SeaOrmProxiesRepo>,
    }

    #[async_trait]
    impl ProxiesRepo for FailingWriteRepo {
        async fn insert(
            &self,
            model: proxies::ActiveModel,
        ) -> Result<proxies::Model, sea_orm::DbErr> {
            self.inner.insert(model).await
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<proxies::Model>, sea_orm::DbErr> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_id_with_txn(
            &self,
            txn: &DatabaseTransaction,
            id: i64,
        ) -> Result<Option<proxies::Model>, sea_orm::DbErr> {
            self.inner.find_by_id_with_txn(txn, id).await
        }

        async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<proxies::Model>, sea_orm::DbErr> {
            self.inner.find_by_ids(ids).await
        }

        async fn find_all(&self) -> Result<Vec<proxies::Model>, sea_orm::DbErr> {
            self.inner.find_all().await
        }

        async fn list(
            &self,
            status: Option<ProxyStatus>,
        ) -> Result<Vec<(proxies::Model, u64)>, sea_orm::DbErr> {
            self.inner.list(status).await
        }

        async fn find_by_id_with_count(
            &self,
            id: i64,
        ) -> Result<Option<(proxies::Model, u64)>, sea_orm::DbErr> {
            self.inner.find_by_id_with_count(id).await
        }

        async fn update(
            &self,
            model: proxies::ActiveModel,
        ) -> Result<proxies::Model, sea_orm::DbErr> {
            self.inner.update(model).await
        }

        async fn set_status(
            &self,
            id: i64,
            status: ProxyStatus,
            checked_at: Option<DateTimeWithTimeZone>,
        ) -> Result<(), sea_orm::DbErr> {
            if checked_at.is_some() {
                return Err(sea_orm::DbErr::Custom("store unavailable".to_string()));
            }
            self.inner.set_status(id, status, checked_at).await
        }

        async fn delete(&self, id: i64) -> Result<bool, sea_orm::DbErr> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn failed_persistence_is_reported_per_proxy_without_stopping_the_batch() {
        let db = memory_client().await;
        let inner = Arc::new(SeaOrmProxiesRepo::new(db));
        insert_proxy(&inner, ProxyKind::Socks5, "10.0.2.1", 1080).await;
        insert_proxy(&inner, ProxyKind::Socks5, "10.0.2.2", 1080).await;

        let repo = Arc::new(FailingWriteRepo {
            inner: inner.clone(),
        });
        let prober = Arc::new(StubProber::new(ProbeVerdict::Valid, Duration::ZERO));
        let service = ProxyCheckServiceImpl::new(repo, prober, 2);

        let report = service
            .check_batch(None, &CancelFlag::new())
            .await
            .expect("batch");

        assert_eq!(report.checked, 2);
        for outcome in &report.results {
            assert_eq!(outcome.status, ProxyStatus::Valid);
            assert!(outcome.error.is_some());
        }
    }
}
