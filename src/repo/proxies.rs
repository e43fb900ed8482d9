use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::{
    entities::{accounts, enums::ProxyStatus, proxies},
    state::DatabaseClient,
};

#[async_trait]
pub trait ProxiesRepo: Send + Sync {
    async fn insert(&self, model: proxies::ActiveModel) -> Result<proxies::Model, sea_orm::DbErr>;
    async fn find_by_id(&self, id: i64) -> Result<Option<proxies::Model>, sea_orm::DbErr>;
    async fn find_by_id_with_txn(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<Option<proxies::Model>, sea_orm::DbErr>;
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<proxies::Model>, sea_orm::DbErr>;
    async fn find_all(&self) -> Result<Vec<proxies::Model>, sea_orm::DbErr>;
    /// Proxies ordered by id, each with the number of accounts bound to it.
    async fn list(
        &self,
        status: Option<ProxyStatus>,
    ) -> Result<Vec<(proxies::Model, u64)>, sea_orm::DbErr>;
    async fn find_by_id_with_count(
        &self,
        id: i64,
    ) -> Result<Option<(proxies::Model, u64)>, sea_orm::DbErr>;
    async fn update(&self, model: proxies::ActiveModel) -> Result<proxies::Model, sea_orm::DbErr>;
    /// Persist a status transition for one proxy; `checked_at` is written only
    /// when given. A proxy deleted mid-flight makes this a no-op.
    async fn set_status(
        &self,
        id: i64,
        status: ProxyStatus,
        checked_at: Option<DateTimeWithTimeZone>,
    ) -> Result<(), sea_orm::DbErr>;
    /// Delete the proxy, clearing `proxy_id` on dependent accounts in the
    /// same transaction. Returns false when the id is unknown.
    async fn delete(&self, id: i64) -> Result<bool, sea_orm::DbErr>;
}

pub struct SeaOrmProxiesRepo {
    db: std::sync::Arc<dyn DatabaseClient>,
}

impl SeaOrmProxiesRepo {
    pub fn new(db: std::sync::Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProxiesRepo for SeaOrmProxiesRepo {
    async fn insert(&self, model: proxies::ActiveModel) -> Result<proxies::Model, sea_orm::DbErr> {
        model.insert(self.db.conn()).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<proxies::Model>, sea_orm::DbErr> {
        proxies::Entity::find_by_id(id).one(self.db.conn()).await
    }

    async fn find_by_id_with_txn(
        &self,
        txn: &DatabaseTransaction,
        id: i64,
    ) -> Result<Option<proxies::Model>, sea_orm::DbErr> {
        proxies::Entity::find_by_id(id).one(txn).await
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<proxies::Model>, sea_orm::DbErr> {
        proxies::Entity::find()
            .filter(proxies::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(proxies::Column::Id)
            .all(self.db.conn())
            .await
    }

    async fn find_all(&self) -> Result<Vec<proxies::Model>, sea_orm::DbErr> {
        proxies::Entity::find()
            .order_by_asc(proxies::Column::Id)
            .all(self.db.conn())
            .await
    }

    async fn list(
        &self,
        status: Option<ProxyStatus>,
    ) -> Result<Vec<(proxies::Model, u64)>, sea_orm::DbErr> {
        let mut query = proxies::Entity::find().find_with_related(accounts::Entity);
        if let Some(status) = status {
            query = query.filter(proxies::Column::Status.eq(status));
        }
        let rows = query.order_by_asc(proxies::Column::Id).all(self.db.conn()).await?;
        Ok(rows
            .into_iter()
            .map(|(proxy, accounts)| (proxy, accounts.len() as u64))
            .collect())
    }

    async fn find_by_id_with_count(
        &self,
        id: i64,
    ) -> Result<Option<(proxies::Model, u64)>, sea_orm::DbErr> {
        let rows = proxies::Entity::find_by_id(id)
            .find_with_related(accounts::Entity)
            .all(self.db.conn())
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|(proxy, accounts)| (proxy, accounts.len() as u64)))
    }

    async fn update(&self, model: proxies::ActiveModel) -> Result<proxies::Model, sea_orm::DbErr> {
        model.update(self.db.conn()).await
    }

    async fn set_status(
        &self,
        id: i64,
        status: ProxyStatus,
        checked_at: Option<DateTimeWithTimeZone>,
    ) -> Result<(), sea_orm::DbErr> {
        let mut active = proxies::ActiveModel {
            status: Set(status),
            ..Default::default()
        };
        if let Some(checked_at) = checked_at {
            active.last_checked_at = Set(Some(checked_at));
        }
        proxies::Entity::update_many()
            .set(active)
            .filter(proxies::Column::Id.eq(id))
            .exec(self.db.conn())
            .await
            .map(|_| ())
    }

    async fn delete(&self, id: i64) -> Result<bool, sea_orm::DbErr> {
        let txn = self.db.conn().begin().await?;
        if proxies::Entity::find_by_id(id).one(&txn).await?.is_none() {
            txn.rollback().await?;
            return Ok(false);
        }
        accounts::Entity::update_many()
            .set(accounts::ActiveModel {
                proxy_id: Set(None),
                ..Default::default()
            })
            .filter(accounts::Column::ProxyId.eq(id))
            .exec(&txn)
            .await?;
        proxies::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(true)
    }
}
