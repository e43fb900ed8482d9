use sea_orm_migration::prelude::*;

pub(super) async fn apply(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    if manager.has_table("account_tags").await? {
        return Ok(());
    }

    manager
        .create_table(
            Table::create()
                .table(AccountTags::Table)
                .if_not_exists()
                .col(ColumnDef::new(AccountTags::AccountId).big_integer().not_null())
                .col(ColumnDef::new(AccountTags::TagId).big_integer().not_null())
                .primary_key(
                    Index::create()
                        .col(AccountTags::AccountId)
                        .col(AccountTags::TagId),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_account_tags_account_id")
                        .from(AccountTags::Table, AccountTags::AccountId)
                        .to(Accounts::Table, Accounts::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_account_tags_tag_id")
                        .from(AccountTags::Table, AccountTags::TagId)
                        .to(Tags::Table, Tags::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .to_owned(),
        )
        .await?;

    Ok(())
}

#[derive(Iden)]
enum AccountTags {
    Table,
    AccountId,
    TagId,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}

#[derive(Iden)]
enum Tags {
    Table,
    Id,
}
