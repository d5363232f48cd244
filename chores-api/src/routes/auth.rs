/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/register` - Register new user
/// - `POST /auth/login` - Login and get a bearer token
///
/// Both accept a JSON object or a urlencoded form with `username` and
/// `password`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::JsonOrForm,
    format::{Formatted, Payload, ResponseFormat},
};
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// Register and login request
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "username required (at most 100 characters)"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "password required"))]
    pub password: String,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Signed bearer token
    pub token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Flattens validator output into one message, ordered by field
fn validation_message(errors: ValidationErrors) -> String {
    let mut messages: Vec<(String, String)> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                (
                    field.to_string(),
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                )
            })
        })
        .collect();

    messages.sort();
    messages
        .into_iter()
        .map(|(_, message)| message)
        .collect::<Vec<_>>()
        .join("; ")
}

fn validate(req: &CredentialsRequest) -> ApiResult<()> {
    let trimmed = CredentialsRequest {
        username: req.username.trim().to_string(),
        password: req.password.clone(),
    };
    trimmed
        .validate()
        .map_err(|e| ApiError::BadRequest(validation_message(e)))
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /auth/register
/// Content-Type: application/json
///
/// { "username": "alice", "password": "pw1" }
/// ```
///
/// # Response
///
/// `201 Created` with `{ "message": "user registered" }`
///
/// # Errors
///
/// - `400 Bad Request`: Missing username or password
/// - `409 Conflict`: Username already exists
pub async fn register(
    State(state): State<AppState>,
    format: ResponseFormat,
    JsonOrForm(req): JsonOrForm<CredentialsRequest>,
) -> ApiResult<Formatted> {
    validate(&req)?;

    state.auth.register(&req.username, &req.password).await?;

    let body = RegisterResponse {
        message: "user registered".to_string(),
    };
    Ok(Formatted::created(format, Payload::record("registration", &body)?))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// { "username": "alice", "password": "pw1" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "token": "eyJ...",
///   "token_type": "Bearer",
///   "expires_at": "2025-01-10T02:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing username or password
/// - `401 Unauthorized`: Invalid credentials (same message for unknown users)
pub async fn login(
    State(state): State<AppState>,
    format: ResponseFormat,
    JsonOrForm(req): JsonOrForm<CredentialsRequest>,
) -> ApiResult<Formatted> {
    validate(&req)?;

    let issued = state.auth.login(&req.username, &req.password).await?;

    let body = LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
    };
    Ok(Formatted::ok(format, Payload::record("token", &body)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_validation_accepts_credentials() {
        assert!(validate(&request("alice", "pw1")).is_ok());
    }

    #[test]
    fn test_validation_reports_every_missing_field() {
        let err = validate(&request("  ", "")).unwrap_err();
        match err {
            ApiError::BadRequest(msg) => {
                assert_eq!(msg, "password required; username required (at most 100 characters)")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_long_username() {
        assert!(validate(&request(&"a".repeat(101), "pw1")).is_err());
    }
}
