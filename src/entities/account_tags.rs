use sea_orm::entity::prelude::*;

/// Palette value applied when a tag is created without an explicit color.
pub const DEFAULT_COLOR: &str = "#a855f7";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub color: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account_tag_links::Entity")]
    AccountLinks,
}

impl Related<super::account_tag_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountLinks.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        super::account_tag_links::Relation::Account.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::account_tag_links::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
