use std::sync::Arc;

use chrono::Utc;

use super::{TokenGenerator, parse_token};
use crate::server::AppState;
use crate::types::{Activity, Session};

#[derive(Debug)]
pub enum SessionValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

pub struct ValidatedSession {
    pub session: Session,
    pub activity: Option<Activity>,
}

/// Extracts a token string from a Basic auth header.
/// Expects format: Basic base64(x-token:actual_token)
pub fn extract_basic_auth_token(header: &str) -> Option<String> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (username, password) = credentials.split_once(':')?;

    if username != "x-token" {
        return None;
    }

    Some(password.to_string())
}

/// Validates a raw session token against the store.
/// Returns the session and the activity it speaks for (if any).
pub fn validate_session(
    state: &Arc<AppState>,
    raw_token: &str,
) -> Result<ValidatedSession, SessionValidationError> {
    let (lookup, _secret) =
        parse_token(raw_token).map_err(|_| SessionValidationError::InvalidToken)?;

    let session = state
        .store
        .get_session_by_lookup(&lookup)
        .map_err(|_| SessionValidationError::InternalError)?
        .ok_or(SessionValidationError::InvalidToken)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_token, &session.token_hash)
        .map_err(|_| SessionValidationError::InternalError)?
    {
        return Err(SessionValidationError::InvalidToken);
    }

    if let Some(expires_at) = &session.expires_at {
        if expires_at < &Utc::now() {
            return Err(SessionValidationError::TokenExpired);
        }
    }

    let activity = match &session.activity_id {
        Some(activity_id) => state
            .store
            .get_activity(activity_id)
            .map_err(|_| SessionValidationError::InternalError)?,
        None => None,
    };

    if let Err(e) = state.store.update_session_last_used(&session.id) {
        tracing::warn!("Failed to update session last_used_at: {e}");
    }

    Ok(ValidatedSession { session, activity })
}

/// Extracts token from Authorization header (Bearer or Basic).
/// Returns None if no auth header is present.
/// Returns Some(token_string) if auth header is present and valid format.
/// Returns Err if the auth scheme is unsupported.
pub fn extract_token_from_header(
    auth_header: Option<&str>,
) -> Result<Option<String>, SessionValidationError> {
    match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            Ok(Some(header.strip_prefix("Bearer ").unwrap().to_string()))
        }
        Some(header) if header.starts_with("Basic ") => extract_basic_auth_token(header)
            .ok_or(SessionValidationError::InvalidToken)
            .map(Some),
        Some(_) => Err(SessionValidationError::InvalidScheme),
        None => Ok(None),
    }
}
