use crate::server::response::ApiError;

const MAX_KEY_LEN: usize = 20;
const MAX_TITLE_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;

fn is_valid_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Project keys are short slugs used in goal references.
pub fn validate_project_key(key: &str) -> Result<(), ApiError> {
    if key.is_empty() {
        return Err(ApiError::bad_request("Project key cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ApiError::bad_request(format!(
            "Project key cannot exceed {MAX_KEY_LEN} characters"
        )));
    }
    if !key.chars().all(is_valid_key_char) {
        return Err(ApiError::bad_request(
            "Project key can only contain alphanumeric characters, hyphens, and underscores",
        ));
    }
    if key.starts_with('-') || key.starts_with('_') {
        return Err(ApiError::bad_request(
            "Project key cannot start with a hyphen or underscore",
        ));
    }
    Ok(())
}

pub fn validate_title(title: &str, entity: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::bad_request(format!(
            "{entity} title cannot be empty"
        )));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "{entity} title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Shallow shape check for invite emails; deliverability is not our
/// concern, catching obvious typos before a ghost row is.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(ApiError::bad_request(format!(
            "Email cannot exceed {MAX_EMAIL_LEN} characters"
        )));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request(format!("Invalid email '{email}'")));
    }
    Ok(())
}
