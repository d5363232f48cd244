/// Auth service: registration, login and bearer-token authentication
///
/// The service owns the credential store handle, the signing secret and the
/// token lifetime. Tokens are stateless; nothing about a login is persisted.
///
/// # Example
///
/// ```no_run
/// use chores_shared::auth::service::AuthService;
/// use chores_shared::db::pool::{create_pool, DatabaseConfig};
/// use chrono::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let auth = AuthService::new(pool, "a-secret-of-at-least-32-characters!!", Duration::hours(2));
///
/// auth.register("alice", "pw1").await?;
/// let issued = auth.login("alice", "pw1").await?;
///
/// let header = format!("Bearer {}", issued.token);
/// let claims = auth.authenticate(Some(&header))?;
/// assert_eq!(claims.sub, "alice");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::jwt::{self, Claims, JwtError};
use super::middleware::extract_bearer;
use super::password::{self, PasswordError};
use crate::db::pool::DbPool;
use crate::models::error::is_unique_violation;
use crate::models::user::{CreateUser, User};

/// Error type for auth operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or blank username/password
    #[error("{0}")]
    InvalidInput(String),

    #[error("username already exists")]
    DuplicateUsername,

    /// Unknown username or wrong password; the two are never distinguished
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("token missing")]
    TokenMissing,

    #[error("token expired")]
    TokenExpired,

    /// Not a bearer credential, bad signature, foreign issuer or malformed
    #[error("invalid token")]
    TokenInvalid,

    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Signing a new token failed
    #[error("token signing failed: {0}")]
    Token(JwtError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// A freshly signed token and the instant it stops being accepted
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    pool: DbPool,
    secret: String,
    token_ttl: Duration,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(pool: DbPool, secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            pool,
            secret: secret.into(),
            token_ttl,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Creates an account
    ///
    /// The username is trimmed; the password is hashed with Argon2id before
    /// it touches the store. A taken username fails with `DuplicateUsername`,
    /// decided by the unique index.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "username and password required".to_string(),
            ));
        }

        let password_hash = hash_blocking(password.to_string()).await?;

        let user = User::create(
            &self.pool,
            CreateUser {
                username: username.to_string(),
                password_hash,
            },
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::DuplicateUsername
            } else {
                AuthError::Database(e)
            }
        })?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Verifies credentials and signs a token for `now + ttl`
    ///
    /// Unknown users are verified against a dummy hash, so both failure
    /// paths do the same work and return the same error.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "username and password required".to_string(),
            ));
        }

        let user = User::find_by_username(&self.pool, username).await?;

        let verified = match &user {
            Some(user) => {
                verify_blocking(password.to_string(), Some(user.password_hash.clone())).await?
            }
            None => {
                verify_blocking(password.to_string(), None).await?;
                false
            }
        };

        let user = match (user, verified) {
            (Some(user), true) => user,
            _ => {
                debug!(username, "Login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let claims = Claims::new(user.username.clone(), self.token_ttl);
        let token = jwt::create_token(&claims, &self.secret).map_err(AuthError::Token)?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or_else(|| {
            AuthError::Token(JwtError::CreateError("expiry out of range".to_string()))
        })?;

        info!(username = %user.username, %expires_at, "User logged in");
        Ok(IssuedToken { token, expires_at })
    }

    /// Authenticates an `Authorization` header value against the current time
    pub fn authenticate(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        self.authenticate_at(header, Utc::now().timestamp())
    }

    /// Authenticates an `Authorization` header value as of Unix time `now`
    pub fn authenticate_at(&self, header: Option<&str>, now: i64) -> Result<Claims, AuthError> {
        let token = extract_bearer(header)?;

        jwt::validate_token_at(token, &self.secret, now).map_err(|e| match e {
            JwtError::Expired => {
                debug!("Rejected expired token");
                AuthError::TokenExpired
            }
            other => {
                debug!(error = %other, "Rejected invalid token");
                AuthError::TokenInvalid
            }
        })
    }
}

async fn hash_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))?
        .map_err(AuthError::from)
}

/// Runs verification off the async runtime; `None` verifies against the dummy hash
async fn verify_blocking(password: String, hash: Option<String>) -> Result<bool, AuthError> {
    let outcome = tokio::task::spawn_blocking(move || match hash {
        Some(hash) => password::verify_password(&password, &hash),
        None => password::verify_against_dummy(&password).map(|_| false),
    })
    .await
    .map_err(|e| PasswordError::VerifyError(format!("Verification task failed: {}", e)))?;

    match outcome {
        Ok(verified) => Ok(verified),
        Err(PasswordError::InvalidHash(e)) => {
            warn!(error = %e, "Stored password hash is unreadable");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
