use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use crate::{
    entities::{account_tag_links, account_tags},
    state::DatabaseClient,
};

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn insert(
        &self,
        model: account_tags::ActiveModel,
    ) -> Result<account_tags::Model, sea_orm::DbErr>;
    async fn find_by_id(&self, id: i64) -> Result<Option<account_tags::Model>, sea_orm::DbErr>;
    async fn find_all(&self) -> Result<Vec<account_tags::Model>, sea_orm::DbErr>;
    async fn update(
        &self,
        model: account_tags::ActiveModel,
    ) -> Result<account_tags::Model, sea_orm::DbErr>;
    /// Delete the tag together with its account associations. Returns false
    /// when the id is unknown.
    async fn delete(&self, id: i64) -> Result<bool, sea_orm::DbErr>;
}

pub struct SeaOrmTagsRepo {
    db: std::sync::Arc<dyn DatabaseClient>,
}

impl SeaOrmTagsRepo {
    pub fn new(db: std::sync::Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TagsRepo for SeaOrmTagsRepo {
    async fn insert(
        &self,
        model: account_tags::ActiveModel,
    ) -> Result<account_tags::Model, sea_orm::DbErr> {
        model.insert(self.db.conn()).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<account_tags::Model>, sea_orm::DbErr> {
        account_tags::Entity::find_by_id(id).one(self.db.conn()).await
    }

    async fn find_all(&self) -> Result<Vec<account_tags::Model>, sea_orm::DbErr> {
        account_tags::Entity::find()
            .order_by_asc(account_tags::Column::Id)
            .all(self.db.conn())
            .await
    }

    async fn update(
        &self,
        model: account_tags::ActiveModel,
    ) -> Result<account_tags::Model, sea_orm::DbErr> {
        model.update(self.db.conn()).await
    }

    async fn delete(&self, id: i64) -> Result<bool, sea_orm::DbErr> {
        let txn = self.db.conn().begin().await?;
        if account_tags::Entity::find_by_id(id).one(&txn).await?.is_none() {
            txn.rollback().await?;
            return Ok(false);
        }
        account_tag_links::Entity::delete_many()
            .filter(account_tag_links::Column::TagId.eq(id))
            .exec(&txn)
            .await?;
        account_tags::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(true)
    }
}
