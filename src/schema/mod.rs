use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;

mod account_groups;
mod account_tag_links;
mod account_tags;
mod accounts;
mod proxies;

/// Idempotent schema apply, run once at startup. Referenced tables are
/// created before their dependents.
pub async fn apply(conn: &DatabaseConnection) -> Result<(), DbErr> {
    let manager = SchemaManager::new(conn);

    proxies::apply(&manager).await?;
    account_groups::apply(&manager).await?;
    account_tags::apply(&manager).await?;
    accounts::apply(&manager).await?;
    account_tag_links::apply(&manager).await?;

    Ok(())
}
