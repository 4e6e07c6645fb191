use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{SessionValidationError, extract_token_from_header, validate_session};
use crate::server::AppState;
use crate::types::{Activity, Session};

/// Extractor that requires an admin session
pub struct RequireAdmin(pub Session);

/// Extractor that requires a session speaking for an activity.
/// Mutations use this; a missing activity is a hard 401.
pub struct RequireActivity {
    pub session: Session,
    pub activity: Activity,
}

/// Extractor for reads: resolves the calling activity when a session is
/// presented, and None otherwise. Handlers soft-fail to null/empty
/// instead of raising, so anonymous display calls stay cheap.
pub struct OptionalActivity(pub Option<Activity>);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    NotAdmin,
    NoActivity,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::NoActivity => (
                StatusCode::UNAUTHORIZED,
                "A session with an activity is required for this operation",
            ),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"northstar\"".parse().unwrap(),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = extract_and_validate(parts, state)?;

        if !validated.session.is_admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(validated.session))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireActivity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = extract_and_validate(parts, state)?;

        let activity = validated.activity.ok_or(AuthError::NoActivity)?;

        Ok(RequireActivity {
            session: validated.session,
            activity,
        })
    }
}

impl FromRequestParts<Arc<AppState>> for OptionalActivity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let raw_token = extract_token_from_header(auth_header).map_err(map_validation_error)?;

        match raw_token {
            None => Ok(OptionalActivity(None)),
            Some(raw_token) => {
                let validated =
                    validate_session(state, &raw_token).map_err(map_validation_error)?;
                Ok(OptionalActivity(validated.activity))
            }
        }
    }
}

fn extract_and_validate(
    parts: &mut Parts,
    state: &Arc<AppState>,
) -> Result<super::helpers::ValidatedSession, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let raw_token = extract_token_from_header(auth_header)
        .map_err(map_validation_error)?
        .ok_or(AuthError::MissingAuth)?;

    validate_session(state, &raw_token).map_err(map_validation_error)
}

fn map_validation_error(e: SessionValidationError) -> AuthError {
    match e {
        SessionValidationError::InvalidScheme => AuthError::InvalidScheme,
        SessionValidationError::InvalidToken => AuthError::InvalidToken,
        SessionValidationError::TokenExpired => AuthError::TokenExpired,
        SessionValidationError::InternalError => AuthError::InternalError,
    }
}
