/// Authentication middleware for Axum
///
/// [`require_auth`] validates the `Authorization: Bearer <token>` header of
/// every request passing through it. On success it adds an [`AuthContext`] to
/// the request extensions; on failure it answers 401 and the handler never
/// runs.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use chores_shared::auth::middleware::{require_auth, AuthContext};
/// use chores_shared::auth::service::AuthService;
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.username)
/// }
///
/// fn router(auth: AuthService) -> Router {
///     Router::new()
///         .route("/whoami", get(whoami))
///         .layer(middleware::from_fn_with_state(auth, require_auth))
/// }
/// ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::jwt::Claims;
use super::service::{AuthError, AuthService};

/// Authenticated caller, added to request extensions by [`require_auth`]
///
/// Handlers take it directly as an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Token subject
    pub username: String,

    /// When the presented token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let expires_at =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(AuthError::TokenInvalid)?;

        Ok(Self {
            username: claims.sub,
            expires_at,
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::TokenMissing)
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateUsername => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::TokenMissing
            | AuthError::TokenExpired
            | AuthError::TokenInvalid => StatusCode::UNAUTHORIZED,
            AuthError::Password(_) | AuthError::Token(_) | AuthError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match status {
            StatusCode::BAD_REQUEST => ("bad_request", self.to_string()),
            StatusCode::CONFLICT => ("conflict", self.to_string()),
            StatusCode::UNAUTHORIZED => ("unauthorized", self.to_string()),
            _ => {
                tracing::error!(error = %self, "Authentication failed internally");
                ("internal_error", "An internal error occurred".to_string())
            }
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

/// Pulls the token out of an `Authorization` header value
///
/// An absent header is `TokenMissing`; anything other than a non-empty
/// `Bearer` credential is `TokenInvalid`.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::TokenMissing)?;

    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::TokenInvalid)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::TokenInvalid);
    }

    Ok(token)
}

/// Bearer-token guard for protected routers
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn require_auth(
    State(auth): State<AuthService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::TokenInvalid)?),
        None => None,
    };

    let claims = auth.authenticate(header)?;
    let context = AuthContext::from_claims(claims)?;
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}
