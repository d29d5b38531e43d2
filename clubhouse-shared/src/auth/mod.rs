/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: Access and refresh token generation and validation
/// - [`policy`]: The role policy table consulted by every protected route
/// - [`revocation`]: Stores for revoked token ids (Postgres, Redis, memory)
/// - [`context`]: The authenticated caller handed to route handlers
///
/// # Example
///
/// ```no_run
/// use clubhouse_shared::auth::password::{hash_password, verify_password};
/// use clubhouse_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Str0ngPassword")?;
/// assert!(verify_password("Str0ngPassword", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "a-secret-that-is-at-least-32-bytes-long")?;
/// validate_access_token(&token, "a-secret-that-is-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod context;
pub mod jwt;
pub mod password;
pub mod policy;
pub mod revocation;
