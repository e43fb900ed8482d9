use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{Set, TransactionTrait};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    entities::{accounts, enums::AccountStatus},
    error::AppError,
    repo::{
        accounts::{AccountFilter, AccountRecord, AccountsRepo},
        groups::GroupsRepo,
        proxies::ProxiesRepo,
    },
    state::DatabaseClient,
};

pub struct CreateAccountInput {
    pub phone: Option<String>,
    pub proxy_id: Option<i64>,
    pub group_id: Option<i64>,
}

/// Absent fields leave the account unchanged; clearing a proxy/group
/// reference goes through the bulk mutator with a null value.
pub struct UpdateAccountInput {
    pub proxy_id: Option<i64>,
    pub group_id: Option<i64>,
    pub tag_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Delete,
    SetProxy,
    SetGroup,
}

#[async_trait]
pub trait AccountsService: Send + Sync {
    async fn create(&self, input: CreateAccountInput) -> Result<AccountRecord, AppError>;
    async fn get(&self, id: i64) -> Result<Option<AccountRecord>, AppError>;
    async fn list(&self, filter: AccountFilter) -> Result<Vec<AccountRecord>, AppError>;
    async fn update(
        &self,
        id: i64,
        input: UpdateAccountInput,
    ) -> Result<Option<AccountRecord>, AppError>;
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
    /// Apply one action to many accounts in a single all-or-nothing commit.
    /// Unknown account ids are skipped and excluded from the returned count.
    async fn bulk_apply(
        &self,
        action: BulkAction,
        account_ids: &[i64],
        value: Option<i64>,
    ) -> Result<u64, AppError>;
}

pub struct AccountsServiceImpl {
    db: Arc<dyn DatabaseClient>,
    accounts_repo: Arc<dyn AccountsRepo>,
    proxies_repo: Arc<dyn ProxiesRepo>,
    groups_repo: Arc<dyn GroupsRepo>,
}

impl AccountsServiceImpl {
    pub fn new(
        db: Arc<dyn DatabaseClient>,
        accounts_repo: Arc<dyn AccountsRepo>,
        proxies_repo: Arc<dyn ProxiesRepo>,
        groups_repo: Arc<dyn GroupsRepo>,
    ) -> Self {
        Self {
            db,
            accounts_repo,
            proxies_repo,
            groups_repo,
        }
    }

    async fn ensure_proxy_exists(&self, proxy_id: i64) -> Result<(), AppError> {
        if self.proxies_repo.find_by_id(proxy_id).await?.is_none() {
            return Err(AppError::NotFound("proxy"));
        }
        Ok(())
    }

    async fn ensure_group_exists(&self, group_id: i64) -> Result<(), AppError> {
        if self.groups_repo.find_by_id(group_id).await?.is_none() {
            return Err(AppError::NotFound("group"));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountsService for AccountsServiceImpl {
    async fn create(&self, input: CreateAccountInput) -> Result<AccountRecord, AppError> {
        if let Some(proxy_id) = input.proxy_id {
            self.ensure_proxy_exists(proxy_id).await?;
        }
        if let Some(group_id) = input.group_id {
            self.ensure_group_exists(group_id).await?;
        }

        let model = accounts::ActiveModel {
            phone: Set(input.phone),
            proxy_id: Set(input.proxy_id),
            group_id: Set(input.group_id),
            status: Set(AccountStatus::Unchecked),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let inserted = self.accounts_repo.insert(model).await?;

        self.accounts_repo
            .load(inserted.id)
            .await?
            .ok_or(AppError::NotFound("account"))
    }

    async fn get(&self, id: i64) -> Result<Option<AccountRecord>, AppError> {
        Ok(self.accounts_repo.load(id).await?)
    }

    async fn list(&self, filter: AccountFilter) -> Result<Vec<AccountRecord>, AppError> {
        Ok(self.accounts_repo.list(filter).await?)
    }

    async fn update(
        &self,
        id: i64,
        input: UpdateAccountInput,
    ) -> Result<Option<AccountRecord>, AppError> {
        let Some(model) = self.accounts_repo.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut active: accounts::ActiveModel = model.into();
        let mut dirty = false;
        if let Some(proxy_id) = input.proxy_id {
            self.ensure_proxy_exists(proxy_id).await?;
            active.proxy_id = Set(Some(proxy_id));
            dirty = true;
        }
        if let Some(group_id) = input.group_id {
            self.ensure_group_exists(group_id).await?;
            active.group_id = Set(Some(group_id));
            dirty = true;
        }
        if dirty {
            self.accounts_repo.update(active).await?;
        }

        if let Some(tag_ids) = &input.tag_ids {
            if !self.accounts_repo.set_tags(id, tag_ids).await? {
                return Ok(None);
            }
        }

        Ok(self.accounts_repo.load(id).await?)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.accounts_repo.delete(id).await?)
    }

    async fn bulk_apply(
        &self,
        action: BulkAction,
        account_ids: &[i64],
        value: Option<i64>,
    ) -> Result<u64, AppError> {
        let txn = self.db.conn().begin().await?;
        let targets = self
            .accounts_repo
            .find_by_ids_with_txn(&txn, account_ids)
            .await?;
        let affected = targets.len() as u64;

        match action {
            BulkAction::Delete => {
                for account in &targets {
                    self.accounts_repo.delete_with_txn(&txn, account.id).await?;
                }
            }
            BulkAction::SetProxy => {
                if let Some(proxy_id) = value {
                    if self
                        .proxies_repo
                        .find_by_id_with_txn(&txn, proxy_id)
                        .await?
                        .is_none()
                    {
                        txn.rollback().await?;
                        return Err(AppError::NotFound("proxy"));
                    }
                }
                for account in targets {
                    let mut active: accounts::ActiveModel = account.into();
                    active.proxy_id = Set(value);
                    self.accounts_repo.update_with_txn(&txn, active).await?;
                }
            }
            BulkAction::SetGroup => {
                if let Some(group_id) = value {
                    if self
                        .groups_repo
                        .find_by_id_with_txn(&txn, group_id)
                        .await?
                        .is_none()
                    {
                        txn.rollback().await?;
                        return Err(AppError::NotFound("group"));
                    }
                }
                for account in targets {
                    let mut active: accounts::ActiveModel = account.into();
                    active.group_id = Set(value);
                    self.accounts_repo.update_with_txn(&txn, active).await?;
                }
            }
        }

        txn.commit().await?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entities::{
            account_groups, account_tags,
            enums::{ProxyKind, ProxyStatus},
            proxies,
        },
        repo::{
            accounts::SeaOrmAccountsRepo,
            groups::SeaOrmGroupsRepo,
            proxies::SeaOrmProxiesRepo,
            tags::{SeaOrmTagsRepo, TagsRepo},
        },
        schema,
        state::DatabaseClient,
    };
    use sea_orm::{ConnectOptions, Database};

    struct TestDatabaseClient {
        conn: sea_orm::DatabaseConnection,
    }

    impl DatabaseClient for TestDatabaseClient {
        fn conn(&self) -> &sea_orm::DatabaseConnection {
            &self.conn
        }
    }

    struct Fixture {
        accounts_repo: Arc<SeaOrmAccountsRepo>,
        proxies_repo: Arc<SeaOrmProxiesRepo>,
        groups_repo: Arc<SeaOrmGroupsRepo>,
        tags_repo: Arc<SeaOrmTagsRepo>,
        service: AccountsServiceImpl,
    }

    async fn fixture() -> Fixture {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1);
        let conn = Database::connect(options).await.expect("sqlite connect");
        schema::apply(&conn).await.expect("schema apply");

        let db: Arc<dyn DatabaseClient> = Arc::new(TestDatabaseClient { conn });
        let accounts_repo = Arc::new(SeaOrmAccountsRepo::new(db.clone()));
        let proxies_repo = Arc::new(SeaOrmProxiesRepo::new(db.clone()));
        let groups_repo = Arc::new(SeaOrmGroupsRepo::new(db.clone()));
        let tags_repo = Arc::new(SeaOrmTagsRepo::new(db.clone()));
        let service = AccountsServiceImpl::new(
            db,
            accounts_repo.clone(),
            proxies_repo.clone(),
            groups_repo.clone(),
        );

        Fixture {
            accounts_repo,
            proxies_repo,
            groups_repo,
            tags_repo,
            service,
        }
    }

    async fn create_account(fixture: &Fixture) -> i64 {
        fixture
            .service
            .create(CreateAccountInput {
                phone: Some("+1000000".to_string()),
                proxy_id: None,
                group_id: None,
            })
            .await
            .expect("create account")
            .account
            .id
    }

    async fn create_proxy(fixture: &Fixture) -> i64 {
        fixture
            .proxies_repo
            .insert(proxies::ActiveModel {
                kind: Set(ProxyKind::Socks5),
                host: Set("10.0.0.1".to_string()),
                port: Set(1080),
                status: Set(ProxyStatus::Unchecked),
                created_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .await
            .expect("create proxy")
            .id
    }

    async fn create_group(fixture: &Fixture, name: &str) -> i64 {
        fixture
            .groups_repo
            .insert(account_groups::ActiveModel {
                name: Set(name.to_string()),
                created_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .await
            .expect("create group")
            .id
    }

    async fn create_tag(fixture: &Fixture, name: &str) -> i64 {
        fixture
            .tags_repo
            .insert(account_tags::ActiveModel {
                name: Set(name.to_string()),
                color: Set(account_tags::DEFAULT_COLOR.to_string()),
                created_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .await
            .expect("create tag")
            .id
    }

    #[tokio::test]
    async fn bulk_delete_skips_unknown_ids() {
        let fixture = fixture().await;
        let first = create_account(&fixture).await;
        let second = create_account(&fixture).await;

        let affected = fixture
            .service
            .bulk_apply(BulkAction::Delete, &[first, second, 999], None)
            .await
            .expect("bulk delete");

        assert_eq!(affected, 2);
        assert!(fixture
            .accounts_repo
            .find_by_id(first)
            .await
            .expect("get")
            .is_none());
        assert!(fixture
            .accounts_repo
            .find_by_id(second)
            .await
            .expect("get")
            .is_none());
    }

    #[tokio::test]
    async fn bulk_set_group_assigns_and_clears() {
        let fixture = fixture().await;
        let first = create_account(&fixture).await;
        let second = create_account(&fixture).await;
        let group = create_group(&fixture, "farm").await;

        let affected = fixture
            .service
            .bulk_apply(BulkAction::SetGroup, &[first, second], Some(group))
            .await
            .expect("bulk set group");
        assert_eq!(affected, 2);
        for id in [first, second] {
            let account = fixture
                .accounts_repo
                .find_by_id(id)
                .await
                .expect("get")
                .expect("row");
            assert_eq!(account.group_id, Some(group));
        }

        // Null value clears the reference.
        fixture
            .service
            .bulk_apply(BulkAction::SetGroup, &[first], None)
            .await
            .expect("bulk clear group");
        let account = fixture
            .accounts_repo
            .find_by_id(first)
            .await
            .expect("get")
            .expect("row");
        assert_eq!(account.group_id, None);
    }

    #[tokio::test]
    async fn bulk_set_proxy_with_unknown_target_changes_nothing() {
        let fixture = fixture().await;
        let first = create_account(&fixture).await;
        let second = create_account(&fixture).await;

        let err = fixture
            .service
            .bulk_apply(BulkAction::SetProxy, &[first, second], Some(424242))
            .await
            .expect_err("missing proxy");
        assert!(matches!(err, AppError::NotFound(_)));

        for id in [first, second] {
            let account = fixture
                .accounts_repo
                .find_by_id(id)
                .await
                .expect("get")
                .expect("row");
            assert_eq!(account.proxy_id, None);
        }
    }

    #[tokio::test]
    async fn tag_replacement_is_whole_set() {
        let fixture = fixture().await;
        let account = create_account(&fixture).await;
        let old_tag = create_tag(&fixture, "old").await;
        let first = create_tag(&fixture, "eu").await;
        let second = create_tag(&fixture, "fresh").await;

        fixture
            .accounts_repo
            .set_tags(account, &[old_tag])
            .await
            .expect("seed tags");

        // Unknown ids drop out; the new set fully replaces the old.
        fixture
            .accounts_repo
            .set_tags(account, &[first, second, 999])
            .await
            .expect("replace tags");
        let record = fixture
            .accounts_repo
            .load(account)
            .await
            .expect("load")
            .expect("row");
        let mut tag_ids: Vec<i64> = record.tags.iter().map(|tag| tag.id).collect();
        tag_ids.sort_unstable();
        assert_eq!(tag_ids, vec![first, second]);

        fixture
            .accounts_repo
            .set_tags(account, &[])
            .await
            .expect("clear tags");
        let record = fixture
            .accounts_repo
            .load(account)
            .await
            .expect("load")
            .expect("row");
        assert!(record.tags.is_empty());
    }

    #[tokio::test]
    async fn deleting_proxy_clears_account_references() {
        let fixture = fixture().await;
        let proxy = create_proxy(&fixture).await;
        let first = create_account(&fixture).await;
        let second = create_account(&fixture).await;
        fixture
            .service
            .bulk_apply(BulkAction::SetProxy, &[first, second], Some(proxy))
            .await
            .expect("assign proxy");

        assert!(fixture.proxies_repo.delete(proxy).await.expect("delete"));

        for id in [first, second] {
            let account = fixture
                .accounts_repo
                .find_by_id(id)
                .await
                .expect("get")
                .expect("account survives proxy deletion");
            assert_eq!(account.proxy_id, None);
        }
    }

    #[tokio::test]
    async fn deleting_group_clears_account_references() {
        let fixture = fixture().await;
        let group = create_group(&fixture, "temp").await;
        let account = create_account(&fixture).await;
        fixture
            .service
            .bulk_apply(BulkAction::SetGroup, &[account], Some(group))
            .await
            .expect("assign group");

        assert!(fixture.groups_repo.delete(group).await.expect("delete"));

        let account = fixture
            .accounts_repo
            .find_by_id(account)
            .await
            .expect("get")
            .expect("account survives group deletion");
        assert_eq!(account.group_id, None);
    }

    #[tokio::test]
    async fn update_replaces_tags_and_keeps_other_fields() {
        let fixture = fixture().await;
        let account = create_account(&fixture).await;
        let tag = create_tag(&fixture, "pinned").await;

        let record = fixture
            .service
            .update(
                account,
                UpdateAccountInput {
                    proxy_id: None,
                    group_id: None,
                    tag_ids: Some(vec![tag]),
                },
            )
            .await
            .expect("update")
            .expect("row");

        assert_eq!(record.account.phone.as_deref(), Some("+1000000"));
        assert_eq!(record.tags.len(), 1);
        assert_eq!(record.tags[0].id, tag);
    }
}
