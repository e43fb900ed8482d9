use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::{
    entities::{account_groups, accounts},
    state::DatabaseClient,
};

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn insert(
        &self,
        model: account_groups::ActiveModel,
    ) -> Result<account_groups::Model, sea_orm::DbErr>;
    async fn find_by_id(&self, id: i64) -> Result<Option<account_groups::Model>, sea_orm::DbErr>;
    async fn find_by_id_with_txn(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<Option<account_groups::Model>, sea_orm::DbErr>;
    /// Groups ordered by id, each with the number of accounts assigned to it.
    async fn list(&self) -> Result<Vec<(account_groups::Model, u64)>, sea_orm::DbErr>;
    async fn find_by_id_with_count(
        &self,
        id: i64,
    ) -> Result<Option<(account_groups::Model, u64)>, sea_orm::DbErr>;
    async fn update(
        &self,
        model: account_groups::ActiveModel,
    ) -> Result<account_groups::Model, sea_orm::DbErr>;
    /// Delete the group, clearing `group_id` on dependent accounts in the
    /// same transaction. Returns false when the id is unknown.
    async fn delete(&self, id: i64) -> Result<bool, sea_orm::DbErr>;
}

pub struct SeaOrmGroupsRepo {
    db: std::sync::Arc<dyn DatabaseClient>,
}

impl SeaOrmGroupsRepo {
    pub fn new(db: std::sync::Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GroupsRepo for SeaOrmGroupsRepo {
    async fn insert(
        &self,
        model: account_groups::ActiveModel,
    ) -> Result<account_groups::Model, sea_orm::DbErr> {
        model.insert(self.db.conn()).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<account_groups::Model>, sea_orm::DbErr> {
        account_groups::Entity::find_by_id(id).one(self.db.conn()).await
    }

    async fn find_by_id_with_txn(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<Option<account_groups::Model>, sea_orm::DbErr> {
        account_groups::Entity::find_by_id(id).one(txn).await
    }

    async fn list(&self) -> Result<Vec<(account_groups::Model, u64)>, sea_orm::DbErr> {
        let rows = account_groups::Entity::find()
            .find_with_related(accounts::Entity)
            .order_by_asc(account_groups::Column::Id)
            .all(self.db.conn())
            .await?;
        Ok(rows
            .into_iter()
            .map(|(group, accounts)| (group, accounts.len() as u64))
            .collect())
    }

    async fn find_by_id_with_count(
        &self,
        id: i64,
    ) -> Result<Option<(account_groups::Model, u64)>, sea_orm::DbErr> {
        let rows = account_groups::Entity::find_by_id(id)
            .find_with_related(accounts::Entity)
            .all(self.db.conn())
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|(group, accounts)| (group, accounts.len() as u64)))
    }

    async fn update(
        &self,
        model: account_groups::ActiveModel,
    ) -> Result<account_groups::Model, sea_orm::DbErr> {
        model.update(self.db.conn()).await
    }

    async fn delete(&self, id: i64) -> Result<bool, sea_orm::DbErr> {
        let txn = self.db.conn().begin().await?;
        if account_groups::Entity::find_by_id(id).one(&txn).await?.is_none() {
            txn.rollback().await?;
            return Ok(false);
        }
        accounts::Entity::update_many()
            .set(accounts::ActiveModel {
                group_id: Set(None),
                ..Default::default()
            })
            .filter(accounts::Column::GroupId.eq(id))
            .exec(&txn)
            .await?;
        account_groups::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(true)
    }
}
