use utoipa::OpenApi;

use crate::{
    handler,
    handler::{
        accounts::{
            AccountList, AccountResponse, BulkActionRequest, BulkActionResponse, CreateAccount,
            GroupBrief, ProxyBrief, UpdateAccount,
        },
        groups::{CreateGroup, GroupList, GroupResponse},
        health::Health,
        proxies::{
            BulkCreateProxies, BulkCreateResponse, CheckResponse, CreateProxy, ProxyList,
            ProxyResponse,
        },
        tags::{CreateTag, TagList, TagResponse},
        SuccessResponse,
    },
    service::proxy_check::{BatchReport, ProxyOutcome},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handler::health::health,
        handler::accounts::list_accounts,
        handler::accounts::get_account,
        handler::accounts::create_account,
        handler::accounts::update_account,
        handler::accounts::delete_account,
        handler::accounts::bulk_action,
        handler::proxies::list_proxies,
        handler::proxies::get_proxy,
        handler::proxies::create_proxy,
        handler::proxies::create_proxies_bulk,
        handler::proxies::update_proxy,
        handler::proxies::delete_proxy,
        handler::proxies::check_proxy,
        handler::proxies::check_all_proxies,
        handler::groups::list_groups,
        handler::groups::create_group,
        handler::groups::update_group,
        handler::groups::delete_group,
        handler::tags::list_tags,
        handler::tags::create_tag,
        handler::tags::update_tag,
        handler::tags::delete_tag
    ),
    components(schemas(
        Health,
        SuccessResponse,
        CreateAccount,
        UpdateAccount,
        BulkActionRequest,
        BulkActionResponse,
        AccountResponse,
        AccountList,
        ProxyBrief,
        GroupBrief,
        CreateProxy,
        BulkCreateProxies,
        BulkCreateResponse,
        ProxyResponse,
        ProxyList,
        CheckResponse,
        CreateGroup,
        GroupResponse,
        GroupList,
        CreateTag,
        TagResponse,
        TagList,
        BatchReport,
        ProxyOutcome
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "accounts", description = "Account pool"),
        (name = "proxy", description = "Proxies and reachability checks"),
        (name = "groups", description = "Account groups"),
        (name = "tags", description = "Account tags")
    )
)]
pub struct ApiDoc;
