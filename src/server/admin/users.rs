use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::RegisterUserRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_email;
use crate::types::{Activity, Actor, ActorKind, Role, User};

/// Registers a user identity. An email held by a ghost promotes the
/// ghost in place, so the activity id (and everything hanging off it)
/// survives registration.
pub async fn register_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterUserRequest>,
) -> impl IntoResponse {
    validate_email(&req.email)?;

    let store = state.store.as_ref();
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: req.email.clone(),
        name: req.name,
        image: req.image,
        role: req.role.unwrap_or(Role::User),
    };

    let existing = store
        .get_activity_by_email(&req.email)
        .api_err("Failed to check email")?;

    let activity = match existing {
        Some(activity) if activity.kind() == ActorKind::User => {
            return Err(ApiError::conflict("Email is already registered"));
        }
        Some(ghost) => store
            .promote_ghost(&ghost.id, &user)
            .api_err("Failed to promote ghost")?,
        None => {
            let activity = Activity {
                id: Uuid::new_v4().to_string(),
                created_at: now,
                updated_at: now,
                actor: Actor::User(user),
            };
            store
                .create_activity(&activity)
                .api_err("Failed to create user")?;
            activity
        }
    };

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(activity))))
}
