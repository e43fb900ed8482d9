use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    entities::account_groups, error::AppError, handler::SuccessResponse, state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateGroup {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct GroupResponse {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub accounts_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<(account_groups::Model, u64)> for GroupResponse {
    fn from((model, accounts_count): (account_groups::Model, u64)) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            accounts_count,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct GroupList {
    pub data: Vec<GroupResponse>,
}

#[utoipa::path(
    get,
    path = "/api/groups",
    responses(
        (status = 200, description = "All groups", body = GroupList)
    )
)]
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GroupList>, AppError> {
    let rows = state.groups_repo().list().await?;
    Ok(Json(GroupList {
        data: rows.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    request_body = CreateGroup,
    responses(
        (status = 201, description = "Created", body = GroupResponse)
    )
)]
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateGroup>,
) -> Result<(StatusCode, Json<GroupResponse>), AppError> {
    let inserted = state
        .groups_repo()
        .insert(account_groups::ActiveModel {
            name: sea_orm::Set(payload.name),
            color: sea_orm::Set(payload.color),
            created_at: sea_orm::Set(Utc::now().into()),
            ..Default::default()
        })
        .await?;
    Ok((StatusCode::CREATED, Json((inserted, 0).into())))
}

#[utoipa::path(
    put,
    path = "/api/groups/{id}",
    request_body = CreateGroup,
    params(
        ("id" = i64, Path, description = "Group id")
    ),
    responses(
        (status = 200, description = "Updated", body = GroupResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateGroup>,
) -> Result<Json<GroupResponse>, AppError> {
    let model = state
        .groups_repo()
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("group"))?;

    let mut active: account_groups::ActiveModel = model.into();
    active.name = sea_orm::Set(payload.name);
    if payload.color.is_some() {
        active.color = sea_orm::Set(payload.color);
    }
    let updated = state.groups_repo().update(active).await?;

    let row = state
        .groups_repo()
        .find_by_id_with_count(updated.id)
        .await?
        .ok_or(AppError::NotFound("group"))?;
    Ok(Json(row.into()))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{id}",
    params(
        ("id" = i64, Path, description = "Group id")
    ),
    responses(
        (status = 200, description = "Deleted; member accounts keep living with the reference cleared", body = SuccessResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.groups_repo().delete(id).await? {
        return Err(AppError::NotFound("group"));
    }
    Ok(Json(SuccessResponse::ok()))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/groups", get(list_groups).post(create_group))
        .route(
            "/api/groups/:id",
            axum::routing::put(update_group).delete(delete_group),
        )
        .with_state(state)
}
