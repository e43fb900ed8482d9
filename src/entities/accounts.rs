use sea_orm::entity::prelude::*;

use super::enums::AccountStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub telegram_id: Option<i64>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: AccountStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub session_string: Option<String>,
    pub proxy_id: Option<i64>,
    pub group_id: Option<i64>,
    pub last_checked_at: Option<DateTimeWithTimeZone>,
    pub last_used_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::proxies::Entity",
        from = "Column::ProxyId",
        to = "super::proxies::Column::Id",
        on_delete = "SetNull"
    )]
    Proxy,
    #[sea_orm(
        belongs_to = "super::account_groups::Entity",
        from = "Column::GroupId",
        to = "super::account_groups::Column::Id",
        on_delete = "SetNull"
    )]
    Group,
    #[sea_orm(has_many = "super::account_tag_links::Entity")]
    TagLinks,
}

impl Related<super::proxies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proxy.def()
    }
}

impl Related<super::account_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::account_tag_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TagLinks.def()
    }
}

impl Related<super::account_tags::Entity> for Entity {
    fn to() -> RelationDef {
        super::account_tag_links::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::account_tag_links::Relation::Account.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
