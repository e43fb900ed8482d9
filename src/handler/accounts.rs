use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::{
    entities::{
        account_groups,
        enums::{AccountStatus, ProxyKind, ProxyStatus},
        proxies,
    },
    error::AppError,
    handler::{tags::TagResponse, SuccessResponse},
    repo::accounts::{AccountFilter, AccountRecord},
    service::accounts::{BulkAction, CreateAccountInput, UpdateAccountInput},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateAccount {
    pub phone: Option<String>,
    pub proxy_id: Option<i64>,
    pub group_id: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAccount {
    pub proxy_id: Option<i64>,
    pub group_id: Option<i64>,
    pub tag_ids: Option<Vec<i64>>,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkActionRequest {
    pub action: BulkAction,
    pub account_ids: Vec<i64>,
    pub value: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct BulkActionResponse {
    pub success: bool,
    pub affected: u64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccountListQuery {
    pub status: Option<AccountStatus>,
    pub group_id: Option<i64>,
    pub tag_id: Option<i64>,
}

/// Shallow proxy snapshot nested inside an account. Credentials stay private.
#[derive(Serialize, ToSchema)]
pub struct ProxyBrief {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ProxyKind,
    pub host: String,
    pub port: i32,
    pub username: Option<String>,
    pub status: ProxyStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<proxies::Model> for ProxyBrief {
    fn from(model: proxies::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            host: model.host,
            port: model.port,
            username: model.username,
            status: model.status,
            last_checked_at: model.last_checked_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct GroupBrief {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<account_groups::Model> for GroupBrief {
    fn from(model: account_groups::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: i64,
    pub telegram_id: Option<i64>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: AccountStatus,
    pub proxy: Option<ProxyBrief>,
    pub proxy_id: Option<i64>,
    pub group: Option<GroupBrief>,
    pub group_id: Option<i64>,
    pub tags: Vec<TagResponse>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRecord> for AccountResponse {
    fn from(record: AccountRecord) -> Self {
        let account = record.account;
        Self {
            id: account.id,
            telegram_id: account.telegram_id,
            username: account.username,
            phone: account.phone,
            first_name: account.first_name,
            last_name: account.last_name,
            status: account.status,
            proxy: record.proxy.map(Into::into),
            proxy_id: account.proxy_id,
            group: record.group.map(Into::into),
            group_id: account.group_id,
            tags: record.tags.into_iter().map(Into::into).collect(),
            last_checked_at: account.last_checked_at.map(|dt| dt.with_timezone(&Utc)),
            last_used_at: account.last_used_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: account.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AccountList {
    pub data: Vec<AccountResponse>,
}

#[utoipa::path(
    get,
    path = "/api/accounts",
    params(AccountListQuery),
    responses(
        (status = 200, description = "Accounts matching the filters", body = AccountList)
    )
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<AccountList>, AppError> {
    let records = state
        .accounts()
        .list(AccountFilter {
            status: query.status,
            group_id: query.group_id,
            tag_id: query.tag_id,
        })
        .await?;

    Ok(Json(AccountList {
        data: records.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/accounts/{id}",
    params(
        ("id" = i64, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Account", body = AccountResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<AccountResponse>, AppError> {
    let record = state
        .accounts()
        .get(id)
        .await?
        .ok_or(AppError::NotFound("account"))?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    post,
    path = "/api/accounts",
    request_body = CreateAccount,
    responses(
        (status = 201, description = "Created", body = AccountResponse),
        (status = 404, description = "Referenced proxy or group not found")
    )
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAccount>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let record = state
        .accounts()
        .create(CreateAccountInput {
            phone: payload.phone,
            proxy_id: payload.proxy_id,
            group_id: payload.group_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    put,
    path = "/api/accounts/{id}",
    request_body = UpdateAccount,
    params(
        ("id" = i64, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Updated", body = AccountResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAccount>,
) -> Result<Json<AccountResponse>, AppError> {
    let record = state
        .accounts()
        .update(
            id,
            UpdateAccountInput {
                proxy_id: payload.proxy_id,
                group_id: payload.group_id,
                tag_ids: payload.tag_ids,
            },
        )
        .await?
        .ok_or(AppError::NotFound("account"))?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    delete,
    path = "/api/accounts/{id}",
    params(
        ("id" = i64, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.accounts().delete(id).await? {
        return Err(AppError::NotFound("account"));
    }
    Ok(Json(SuccessResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/accounts/bulk-action",
    request_body = BulkActionRequest,
    responses(
        (status = 200, description = "Action applied", body = BulkActionResponse),
        (status = 404, description = "Referenced proxy or group not found")
    )
)]
pub async fn bulk_action(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkActionRequest>,
) -> Result<Json<BulkActionResponse>, AppError> {
    let affected = state
        .accounts()
        .bulk_apply(payload.action, &payload.account_ids, payload.value)
        .await?;
    Ok(Json(BulkActionResponse {
        success: true,
        affected,
    }))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/accounts", get(list_accounts).post(create_account))
        .route("/api/accounts/bulk-action", post(bulk_action))
        .route(
            "/api/accounts/:id",
            get(get_account)
                .put(update_account)
                .delete(delete_account),
        )
        .with_state(state)
}
