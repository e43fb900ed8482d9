use sea_orm_migration::prelude::*;

pub(super) async fn apply(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    if manager.has_table("accounts").await? {
        return Ok(());
    }

    manager
        .create_table(
            Table::create()
                .table(Accounts::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Accounts::Id)
                        .big_integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Accounts::TelegramId).big_integer())
                .col(ColumnDef::new(Accounts::Username).string())
                .col(ColumnDef::new(Accounts::Phone).string())
                .col(ColumnDef::new(Accounts::FirstName).string())
                .col(ColumnDef::new(Accounts::LastName).string())
                .col(ColumnDef::new(Accounts::Status).text().not_null())
                .col(ColumnDef::new(Accounts::SessionString).text())
                .col(ColumnDef::new(Accounts::ProxyId).big_integer())
                .col(ColumnDef::new(Accounts::GroupId).big_integer())
                .col(ColumnDef::new(Accounts::LastCheckedAt).timestamp_with_time_zone())
                .col(ColumnDef::new(Accounts::LastUsedAt).timestamp_with_time_zone())
                .col(
                    ColumnDef::new(Accounts::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_accounts_proxy_id")
                        .from(Accounts::Table, Accounts::ProxyId)
                        .to(Proxies::Table, Proxies::Id)
                        .on_delete(ForeignKeyAction::SetNull),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_accounts_group_id")
                        .from(Accounts::Table, Accounts::GroupId)
                        .to(AccountGroups::Table, AccountGroups::Id)
                        .on_delete(ForeignKeyAction::SetNull),
                )
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name("accounts_telegram_id_unique")
                .table(Accounts::Table)
                .col(Accounts::TelegramId)
                .unique()
                .to_owned(),
        )
        .await?;

    Ok(())
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    TelegramId,
    Username,
    Phone,
    FirstName,
    LastName,
    Status,
    SessionString,
    ProxyId,
    GroupId,
    LastCheckedAt,
    LastUsedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Proxies {
    Table,
    Id,
}

#[derive(Iden)]
enum AccountGroups {
    Table,
    Id,
}
