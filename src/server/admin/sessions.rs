use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireAdmin, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::{CreateSessionRequest, CreateSessionResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::Session;

/// Issues a session token for a registered identity. This is the seam a
/// real auth provider would fill; the admin surface stands in for it.
pub async fn create_session(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let activity = store
        .get_activity_by_email(&req.email)
        .api_err("Failed to look up email")?
        .or_not_found("No identity registered for this email")?;

    let generator = TokenGenerator::new();
    let (raw_token, lookup, hash) = generator
        .generate()
        .api_err("Failed to generate session token")?;

    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        is_admin: false,
        activity_id: Some(activity.id),
        created_at: now,
        expires_at: req.expires_in_seconds.map(|s| now + Duration::seconds(s)),
        last_used_at: None,
    };

    store
        .create_session(&session)
        .api_err("Failed to create session")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateSessionResponse {
            token: raw_token,
            session,
        })),
    ))
}

pub async fn list_sessions(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let sessions = state
        .store
        .list_sessions()
        .api_err("Failed to list sessions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(sessions)))
}

pub async fn delete_session(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_session(&id)
        .api_err("Failed to delete session")?;

    if !deleted {
        return Err(ApiError::not_found("Session not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
