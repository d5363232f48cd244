/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: HS256 token signing and validation
/// - [`service`]: registration, login and header authentication
/// - [`middleware`]: Axum guard and the `AuthContext` extractor
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with configurable expiration, zero leeway
/// - **Uniform Login Failures**: unknown users cost the same as wrong passwords
///
/// # Example
///
/// ```
/// use chores_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chores_shared::auth::password::{hash_password, verify_password};
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("pw1")?;
/// assert!(verify_password("pw1", &hash)?);
///
/// let token = create_token(&Claims::new("alice", Duration::hours(2)), "secret-key")?;
/// assert_eq!(validate_token(&token, "secret-key")?.sub, "alice");
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
