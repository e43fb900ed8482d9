use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, JoinType,
    LoaderTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};

use crate::{
    entities::{
        account_groups, account_tag_links, account_tags, accounts, enums::AccountStatus, proxies,
    },
    state::DatabaseClient,
};

/// Equality predicates supported by the account listing.
#[derive(Debug, Default, Clone)]
pub struct AccountFilter {
    pub status: Option<AccountStatus>,
    pub group_id: Option<i64>,
    pub tag_id: Option<i64>,
}

/// An account together with the related rows needed to shape a response.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub account: accounts::Model,
    pub proxy: Option<proxies::Model>,
    pub group: Option<account_groups::Model>,
    pub tags: Vec<account_tags::Model>,
}

#[async_trait]
pub trait AccountsRepo: Send + Sync {
    async fn insert(&self, model: accounts::ActiveModel)
        -> Result<accounts::Model, sea_orm::DbErr>;
    async fn find_by_id(&self, id: i64) -> Result<Option<accounts::Model>, sea_orm::DbErr>;
    async fn find_by_ids_with_txn(
        &self,
        txn: &DatabaseTransaction,
        ids: &[i64],
    ) -> Result<Vec<accounts::Model>, sea_orm::DbErr>;
    /// One account with its proxy, group and tags loaded.
    async fn load(&self, id: i64) -> Result<Option<AccountRecord>, sea_orm::DbErr>;
    /// Accounts ordered by id, filtered, with relations loaded.
    async fn list(&self, filter: AccountFilter) -> Result<Vec<AccountRecord>, sea_orm::DbErr>;
    async fn update(&self, model: accounts::ActiveModel)
        -> Result<accounts::Model, sea_orm::DbErr>;
    async fn update_with_txn(
        &self,
        txn: &DatabaseTransaction,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr>;
    /// Delete the account and its tag associations. Returns false when the id
    /// is unknown.
    async fn delete(&self, id: i64) -> Result<bool, sea_orm::DbErr>;
    async fn delete_with_txn(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<(), sea_orm::DbErr>;
    /// Replace the account's tag set with `tag_ids`. Unknown tag ids are
    /// silently dropped; duplicates collapse. Returns false when the account
    /// id is unknown.
    async fn set_tags(&self, account_id: i64, tag_ids: &[i64]) -> Result<bool, sea_orm::DbErr>;
}

pub struct SeaOrmAccountsRepo {
    db: std::sync::Arc<dyn DatabaseClient>,
}

impl SeaOrmAccountsRepo {
    pub fn new(db: std::sync::Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }

    async fn load_relations<C: ConnectionTrait>(
        conn: &C,
        rows: Vec<accounts::Model>,
    ) -> Result<Vec<AccountRecord>, sea_orm::DbErr> {
        let related_proxies = rows.load_one(proxies::Entity, conn).await?;
        let related_groups = rows.load_one(account_groups::Entity, conn).await?;
        let related_tags = rows
            .load_many_to_many(account_tags::Entity, account_tag_links::Entity, conn)
            .await?;

        Ok(rows
            .into_iter()
            .zip(related_proxies)
            .zip(related_groups)
            .zip(related_tags)
            .map(|(((account, proxy), group), tags)| AccountRecord {
                account,
                proxy,
                group,
                tags,
            })
            .collect())
    }
}

#[async_trait]
impl AccountsRepo for SeaOrmAccountsRepo {
    async fn insert(
        &self,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr> {
        model.insert(self.db.conn()).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<accounts::Model>, sea_orm::DbErr> {
        accounts::Entity::find_by_id(id).one(self.db.conn()).await
    }

    async fn find_by_ids_with_txn(
        &self,
        txn: &DatabaseTransaction,
        ids: &[i64],
    ) -> Result<Vec<accounts::Model>, sea_orm::DbErr> {
        accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(accounts::Column::Id)
            .all(txn)
            .await
    }

    async fn load(&self, id: i64) -> Result<Option<AccountRecord>, sea_orm::DbErr> {
        let conn = self.db.conn();
        let Some(account) = accounts::Entity::find_by_id(id).one(conn).await? else {
            return Ok(None);
        };
        let mut records = Self::load_relations(conn, vec![account]).await?;
        Ok(records.pop())
    }

    async fn list(&self, filter: AccountFilter) -> Result<Vec<AccountRecord>, sea_orm::DbErr> {
        let conn = self.db.conn();
        let mut query = accounts::Entity::find().order_by_asc(accounts::Column::Id);
        if let Some(status) = filter.status {
            query = query.filter(accounts::Column::Status.eq(status));
        }
        if let Some(group_id) = filter.group_id {
            query = query.filter(accounts::Column::GroupId.eq(group_id));
        }
        if let Some(tag_id) = filter.tag_id {
            query = query
                .join(JoinType::InnerJoin, accounts::Relation::TagLinks.def())
                .filter(account_tag_links::Column::TagId.eq(tag_id));
        }
        let rows = query.all(conn).await?;
        Self::load_relations(conn, rows).await
    }

    async fn update(
        &self,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr> {
        model.update(self.db.conn()).await
    }

    async fn update_with_txn(
        &self,
        txn: &DatabaseTransaction,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr> {
        model.update(txn).await
    }

    async fn delete(&self, id: i64) -> Result<bool, sea_orm::DbErr> {
        let txn = self.db.conn().begin().await?;
        if accounts::Entity::find_by_id(id).one(&txn).await?.is_none() {
            txn.rollback().await?;
            return Ok(false);
        }
        self.delete_with_txn(&txn, id).await?;
        txn.commit().await?;
        Ok(true)
    }

    async fn delete_with_txn(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<(), sea_orm::DbErr> {
        account_tag_links::Entity::delete_many()
            .filter(account_tag_links::Column::AccountId.eq(id))
            .exec(txn)
            .await?;
        accounts::Entity::delete_by_id(id).exec(txn).await?;
        Ok(())
    }

    async fn set_tags(&self, account_id: i64, tag_ids: &[i64]) -> Result<bool, sea_orm::DbErr> {
        let txn = self.db.conn().begin().await?;
        if accounts::Entity::find_by_id(account_id)
            .one(&txn)
            .await?
            .is_none()
        {
            txn.rollback().await?;
            return Ok(false);
        }

        // Membership query keeps only tags that exist; unknown ids drop out.
        let existing: Vec<i64> = account_tags::Entity::find()
            .filter(account_tags::Column::Id.is_in(tag_ids.iter().copied()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|tag| tag.id)
            .collect();

        account_tag_links::Entity::delete_many()
            .filter(account_tag_links::Column::AccountId.eq(account_id))
            .exec(&txn)
            .await?;

        if !existing.is_empty() {
            let links = existing.into_iter().map(|tag_id| account_tag_links::ActiveModel {
                account_id: Set(account_id),
                tag_id: Set(tag_id),
            });
            account_tag_links::Entity::insert_many(links).exec(&txn).await?;
        }

        txn.commit().await?;
        Ok(true)
    }
}
