use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{OptionalActivity, RequireActivity};
use crate::server::AppState;
use crate::server::dto::CreateTagRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_title;
use crate::types::Tag;

pub async fn create_tag(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTagRequest>,
) -> impl IntoResponse {
    validate_title(&req.title, "Tag")?;

    let tag = Tag {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        created_at: Utc::now(),
    };

    state.store.create_tag(&tag).api_err("Failed to create tag")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(tag))))
}

pub async fn list_tags(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::success(Vec::<Tag>::new())));
    }

    let tags = state.store.list_tags().api_err("Failed to list tags")?;
    Ok(Json(ApiResponse::success(tags)))
}
