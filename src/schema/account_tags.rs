use sea_orm_migration::prelude::*;

pub(super) async fn apply(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    if manager.has_table("tags").await? {
        return Ok(());
    }

    manager
        .create_table(
            Table::create()
                .table(Tags::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Tags::Id)
                        .big_integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Tags::Name).string().not_null())
                .col(ColumnDef::new(Tags::Color).string().not_null())
                .col(
                    ColumnDef::new(Tags::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name("tags_name_unique")
                .table(Tags::Table)
                .col(Tags::Name)
                .unique()
                .to_owned(),
        )
        .await?;

    Ok(())
}

#[derive(Iden)]
enum Tags {
    Table,
    Id,
    Name,
    Color,
    CreatedAt,
}
