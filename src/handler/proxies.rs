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
        enums::{ProxyKind, ProxyStatus},
        proxies,
    },
    error::AppError,
    handler::SuccessResponse,
    service::proxy_check::{BatchReport, CancelFlag},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateProxy {
    #[serde(rename = "type", default)]
    pub kind: ProxyKind,
    pub host: String,
    pub port: i32,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Lines in `host:port` or `host:port:user:pass` form; malformed lines are
/// skipped, matching the single-create defaults otherwise.
#[derive(Deserialize, ToSchema)]
pub struct BulkCreateProxies {
    pub proxies: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: ProxyKind,
}

#[derive(Serialize, ToSchema)]
pub struct BulkCreateResponse {
    pub created: u64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProxyListQuery {
    pub status: Option<ProxyStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckResponse {
    pub status: ProxyStatus,
}

#[derive(Serialize, ToSchema)]
pub struct ProxyResponse {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ProxyKind,
    pub host: String,
    pub port: i32,
    pub username: Option<String>,
    pub status: ProxyStatus,
    pub accounts_count: u64,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<(proxies::Model, u64)> for ProxyResponse {
    fn from((model, accounts_count): (proxies::Model, u64)) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            host: model.host,
            port: model.port,
            username: model.username,
            status: model.status,
            accounts_count,
            last_checked_at: model.last_checked_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProxyList {
    pub data: Vec<ProxyResponse>,
}

fn parse_proxy_line(line: &str) -> Option<(String, i32, Option<String>, Option<String>)> {
    let mut parts = line.trim().split(':');
    let host = parts.next()?.trim();
    if host.is_empty() {
        return None;
    }
    let port: i32 = parts.next()?.trim().parse().ok()?;
    let username = parts.next().map(str::to_string);
    let password = parts.next().map(str::to_string);
    Some((host.to_string(), port, username, password))
}

#[utoipa::path(
    get,
    path = "/api/proxy",
    params(ProxyListQuery),
    responses(
        (status = 200, description = "Proxies matching the filter", body = ProxyList)
    )
)]
pub async fn list_proxies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProxyListQuery>,
) -> Result<Json<ProxyList>, AppError> {
    let rows = state.proxies_repo().list(query.status).await?;
    Ok(Json(ProxyList {
        data: rows.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/proxy/{id}",
    params(
        ("id" = i64, Path, description = "Proxy id")
    ),
    responses(
        (status = 200, description = "Proxy", body = ProxyResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_proxy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ProxyResponse>, AppError> {
    let row = state
        .proxies_repo()
        .find_by_id_with_count(id)
        .await?
        .ok_or(AppError::NotFound("proxy"))?;
    Ok(Json(row.into()))
}

#[utoipa::path(
    post,
    path = "/api/proxy",
    request_body = CreateProxy,
    responses(
        (status = 201, description = "Created", body = ProxyResponse)
    )
)]
pub async fn create_proxy(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProxy>,
) -> Result<(StatusCode, Json<ProxyResponse>), AppError> {
    let inserted = state
        .proxies_repo()
        .insert(proxies::ActiveModel {
            kind: sea_orm::Set(payload.kind),
            host: sea_orm::Set(payload.host),
            port: sea_orm::Set(payload.port),
            username: sea_orm::Set(payload.username),
            password: sea_orm::Set(payload.password),
            status: sea_orm::Set(ProxyStatus::Unchecked),
            created_at: sea_orm::Set(Utc::now().into()),
            ..Default::default()
        })
        .await?;
    Ok((StatusCode::CREATED, Json((inserted, 0).into())))
}

#[utoipa::path(
    post,
    path = "/api/proxy/bulk",
    request_body = BulkCreateProxies,
    responses(
        (status = 201, description = "Created", body = BulkCreateResponse)
    )
)]
pub async fn create_proxies_bulk(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkCreateProxies>,
) -> Result<(StatusCode, Json<BulkCreateResponse>), AppError> {
    let mut created = 0;
    for line in &payload.proxies {
        let Some((host, port, username, password)) = parse_proxy_line(line) else {
            continue;
        };
        state
            .proxies_repo()
            .insert(proxies::ActiveModel {
                kind: sea_orm::Set(payload.kind),
                host: sea_orm::Set(host),
                port: sea_orm::Set(port),
                username: sea_orm::Set(username),
                password: sea_orm::Set(password),
                status: sea_orm::Set(ProxyStatus::Unchecked),
                created_at: sea_orm::Set(Utc::now().into()),
                ..Default::default()
            })
            .await?;
        created += 1;
    }
    Ok((StatusCode::CREATED, Json(BulkCreateResponse { created })))
}

#[utoipa::path(
    put,
    path = "/api/proxy/{id}",
    request_body = CreateProxy,
    params(
        ("id" = i64, Path, description = "Proxy id")
    ),
    responses(
        (status = 200, description = "Updated", body = ProxyResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_proxy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateProxy>,
) -> Result<Json<ProxyResponse>, AppError> {
    let model = state
        .proxies_repo()
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("proxy"))?;

    let mut active: proxies::ActiveModel = model.into();
    active.kind = sea_orm::Set(payload.kind);
    active.host = sea_orm::Set(payload.host);
    active.port = sea_orm::Set(payload.port);
    active.username = sea_orm::Set(payload.username);
    active.password = sea_orm::Set(payload.password);
    let updated = state.proxies_repo().update(active).await?;

    let row = state
        .proxies_repo()
        .find_by_id_with_count(updated.id)
        .await?
        .ok_or(AppError::NotFound("proxy"))?;
    Ok(Json(row.into()))
}

#[utoipa::path(
    delete,
    path = "/api/proxy/{id}",
    params(
        ("id" = i64, Path, description = "Proxy id")
    ),
    responses(
        (status = 200, description = "Deleted; dependent accounts keep living with the reference cleared", body = SuccessResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_proxy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.proxies_repo().delete(id).await? {
        return Err(AppError::NotFound("proxy"));
    }
    Ok(Json(SuccessResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/proxy/{id}/check",
    params(
        ("id" = i64, Path, description = "Proxy id")
    ),
    responses(
        (status = 200, description = "Probe outcome", body = CheckResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn check_proxy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CheckResponse>, AppError> {
    let status = state.proxy_check().check_one(id).await?;
    Ok(Json(CheckResponse { status }))
}

#[utoipa::path(
    post,
    path = "/api/proxy/check-all",
    responses(
        (status = 200, description = "Batch outcome", body = BatchReport)
    )
)]
pub async fn check_all_proxies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BatchReport>, AppError> {
    let report = state
        .proxy_check()
        .check_batch(None, &CancelFlag::new())
        .await?;
    Ok(Json(report))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/proxy", get(list_proxies).post(create_proxy))
        .route("/api/proxy/bulk", post(create_proxies_bulk))
        .route("/api/proxy/check-all", post(check_all_proxies))
        .route(
            "/api/proxy/:id",
            get(get_proxy).put(update_proxy).delete(delete_proxy),
        )
        .route("/api/proxy/:id/check", post(check_proxy))
        .with_state(state)
}
