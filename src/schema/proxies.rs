use sea_orm_migration::prelude::*;

pub(super) async fn apply(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    if manager.has_table("proxies").await? {
        return Ok(());
    }

    manager
        .create_table(
            Table::create()
                .table(Proxies::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Proxies::Id)
                        .big_integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Proxies::Type).text().not_null())
                .col(ColumnDef::new(Proxies::Host).string().not_null())
                .col(ColumnDef::new(Proxies::Port).integer().not_null())
                .col(ColumnDef::new(Proxies::Username).string())
                .col(ColumnDef::new(Proxies::Password).string())
                .col(ColumnDef::new(Proxies::Status).text().not_null())
                .col(ColumnDef::new(Proxies::LastCheckedAt).timestamp_with_time_zone())
                .col(
                    ColumnDef::new(Proxies::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .to_owned(),
        )
        .await?;

    Ok(())
}

#[derive(Iden)]
enum Proxies {
    Table,
    Id,
    Type,
    Host,
    Port,
    Username,
    Password,
    Status,
    LastCheckedAt,
    CreatedAt,
}
