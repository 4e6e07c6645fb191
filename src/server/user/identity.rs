use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{OptionalActivity, RequireActivity};
use crate::server::AppState;
use crate::server::dto::{FindActivitiesParams, InviteGhostRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_email;
use crate::types::{Activity, Actor, DisplayActor, Ghost};

pub async fn find_activities(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
    Query(params): Query<FindActivitiesParams>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::success(Vec::<DisplayActor>::new())));
    }

    let found = state
        .store
        .find_activities(
            params.query.as_deref().unwrap_or(""),
            params.kind,
            params.sort.unwrap_or_default(),
        )
        .api_err("Failed to search identities")?;

    let displays: Vec<DisplayActor> = found.iter().map(Activity::display).collect();
    Ok(Json(ApiResponse::success(displays)))
}

pub async fn invite_ghost(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<InviteGhostRequest>,
) -> impl IntoResponse {
    validate_email(&req.email)?;

    let store = state.store.as_ref();

    if store
        .get_activity_by_email(&req.email)
        .api_err("Failed to check email")?
        .is_some()
    {
        return Err(ApiError::conflict("Email already belongs to an identity"));
    }

    let now = Utc::now();
    let activity = Activity {
        id: Uuid::new_v4().to_string(),
        created_at: now,
        updated_at: now,
        actor: Actor::Ghost(Ghost {
            id: Uuid::new_v4().to_string(),
            email: req.email,
            host_id: auth.activity.id.clone(),
        }),
    };

    store
        .create_activity(&activity)
        .api_err("Failed to create ghost")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(activity))))
}
