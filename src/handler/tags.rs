use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    entities::account_tags, error::AppError, handler::SuccessResponse, state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateTag {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub color: String,
}

impl From<account_tags::Model> for TagResponse {
    fn from(model: account_tags::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TagList {
    pub data: Vec<TagResponse>,
}

#[utoipa::path(
    get,
    path = "/api/tags",
    responses(
        (status = 200, description = "All tags", body = TagList)
    )
)]
pub async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<TagList>, AppError> {
    let rows = state.tags_repo().find_all().await?;
    Ok(Json(TagList {
        data: rows.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/tags",
    request_body = CreateTag,
    responses(
        (status = 201, description = "Created", body = TagResponse)
    )
)]
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTag>,
) -> Result<(StatusCode, Json<TagResponse>), AppError> {
    let inserted = state
        .tags_repo()
        .insert(account_tags::ActiveModel {
            name: sea_orm::Set(payload.name),
            color: sea_orm::Set(
                payload
                    .color
                    .unwrap_or_else(|| account_tags::DEFAULT_COLOR.to_string()),
            ),
            created_at: sea_orm::Set(chrono::Utc::now().into()),
            ..Default::default()
        })
        .await?;
    Ok((StatusCode::CREATED, Json(inserted.into())))
}

#[utoipa::path(
    put,
    path = "/api/tags/{id}",
    request_body = CreateTag,
    params(
        ("id" = i64, Path, description = "Tag id")
    ),
    responses(
        (status = 200, description = "Updated", body = TagResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateTag>,
) -> Result<Json<TagResponse>, AppError> {
    let model = state
        .tags_repo()
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("tag"))?;

    let mut active: account_tags::ActiveModel = model.into();
    active.name = sea_orm::Set(payload.name);
    active.color = sea_orm::Set(
        payload
            .color
            .unwrap_or_else(|| account_tags::DEFAULT_COLOR.to_string()),
    );
    let updated = state.tags_repo().update(active).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    params(
        ("id" = i64, Path, description = "Tag id")
    ),
    responses(
        (status = 200, description = "Deleted together with its account associations", body = SuccessResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.tags_repo().delete(id).await? {
        return Err(AppError::NotFound("tag"));
    }
    Ok(Json(SuccessResponse::ok()))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/tags", get(list_tags).post(create_tag))
        .route(
            "/api/tags/:id",
            axum::routing::put(update_tag).delete(delete_tag),
        )
        .with_state(state)
}
