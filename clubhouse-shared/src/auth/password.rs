/// Password hashing and strength rules
///
/// Passwords are stored as Argon2id PHC strings
/// (`$argon2id$v=19$m=65536,t=3,p=4$...`). Verification reads the parameters
/// back from the stored hash, so they can be raised later without
/// invalidating existing accounts.
///
/// # Example
///
/// ```
/// use clubhouse_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Matchday2024")?;
/// assert!(verify_password("Matchday2024", &hash)?);
/// assert!(!verify_password("matchday2024", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Message returned when a password fails the strength rules
pub const WEAK_PASSWORD_MESSAGE: &str =
    "Password must contain at least 8 characters, including uppercase, lowercase, and numbers";

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with Argon2id and a random 16-byte salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Returns `Ok(false)` for a wrong password and an error only when the stored
/// hash cannot be parsed or verification itself fails.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!(
            "Verification failed: {}",
            e
        ))),
    }
}

/// Checks the password policy: at least 8 characters with an upper-case
/// letter, a lower-case letter and a digit.
///
/// # Example
///
/// ```
/// use clubhouse_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("Kickoff99").is_ok());
/// assert!(validate_password_strength("kickoff99").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_upper && has_lower && has_digit {
        Ok(())
    } else {
        Err(WEAK_PASSWORD_MESSAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Goalkeeper1").expect("Should hash password");
        assert!(hash.starts_with("$argon2id$v=19$m=65536,t=3,p=4$"));

        assert!(verify_password("Goalkeeper1", &hash).unwrap());
        assert!(!verify_password("Goalkeeper2", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("SamePassword1").unwrap();
        let second = hash_password("SamePassword1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_invalid_hash() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHash(_))));
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Striker9").is_ok());
        assert!(validate_password_strength("LongerPassword2024").is_ok());

        // too short
        assert!(validate_password_strength("Ab1").is_err());
        // missing upper
        assert!(validate_password_strength("striker99").is_err());
        // missing lower
        assert!(validate_password_strength("STRIKER99").is_err());
        // missing digit
        assert!(validate_password_strength("StrikerNine").is_err());
    }

    #[test]
    fn test_weak_password_message() {
        let err = validate_password_strength("weak").unwrap_err();
        assert_eq!(err, WEAK_PASSWORD_MESSAGE);
    }
}
