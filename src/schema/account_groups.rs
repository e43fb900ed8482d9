use sea_orm_migration::prelude::*;

pub(super) async fn apply(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    if manager.has_table("account_groups").await? {
        return Ok(());
    }

    manager
        .create_table(
            Table::create()
                .table(AccountGroups::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(AccountGroups::Id)
                        .big_integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(AccountGroups::Name).string().not_null())
                .col(ColumnDef::new(AccountGroups::Color).string())
                .col(
                    ColumnDef::new(AccountGroups::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .to_owned(),
        )
        .await?;

    Ok(())
}

#[derive(Iden)]
enum AccountGroups {
    Table,
    Id,
    Name,
    Color,
    CreatedAt,
}
