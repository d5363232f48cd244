/// JWT token generation and validation module
///
/// Tokens are self-contained: the server keeps no session table, no
/// revocation list and no refresh tokens. A token is valid until the `exp`
/// embedded in it.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable TTL (2 hours by default)
/// - **Validation**: Signature, issuer, and expiry with zero leeway
///
/// # Example
///
/// ```
/// use chores_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new("alice", Duration::hours(2));
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated.sub, "alice");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer stamped into every token
pub const ISSUER: &str = "chores";

/// Default token lifetime in hours
pub const DEFAULT_TTL_HOURS: i64 = 2;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, issuer or structure did not check out
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,
}

/// JWT claims structure
///
/// - `sub`: Subject (username)
/// - `iss`: Issuer (always "chores")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - username
    pub sub: String,

    /// Issuer - always "chores"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims issued now that expire after `ttl`
    pub fn new(username: impl Into<String>, ttl: Duration) -> Self {
        Self::issued_at(username, Utc::now().timestamp(), ttl)
    }

    /// Creates claims issued at a given Unix timestamp
    pub fn issued_at(username: impl Into<String>, issued_at: i64, ttl: Duration) -> Self {
        Self {
            sub: username.into(),
            iss: ISSUER.to_string(),
            iat: issued_at,
            exp: issued_at + ttl.num_seconds(),
        }
    }

    /// Whether the token is expired at Unix time `now`
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }
}

/// Creates a JWT token from claims
///
/// Signs the token using HS256 with the provided secret.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token against the current time
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_token_at(token, secret, Utc::now().timestamp())
}

/// Validates a JWT token as of Unix time `now`
///
/// Verifies the signature and issuer, then accepts the token only while
/// `now < exp`.
pub fn validate_token_at(token: &str, secret: &str, now: i64) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    // Expiry is checked below against the caller's clock.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = false;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| JwtError::ValidationError(format!("Token validation failed: {}", e)))?;

    if token_data.claims.is_expired_at(now) {
        return Err(JwtError::Expired);
    }

    Ok(token_data.claims)
}
