pub mod account_groups;
pub mod account_tag_links;
pub mod account_tags;
pub mod accounts;
pub mod enums;
pub mod proxies;
