use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

/// Shortest password the provider accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Longest password the provider accepts.
pub const MAX_PASSWORD_LEN: usize = 128;

/// Hash a password using `Argon2id`.
///
/// # Errors
///
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Verify a password against an `Argon2id` hash.
///
/// Returns `true` if the password matches, `false` otherwise.
///
/// # Errors
///
/// Returns an error if the hash format is invalid.
pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Validate the password policy: 6 to 128 characters.
///
/// # Errors
///
/// Returns a descriptive error message if validation fails.
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters."
        ));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password should be at most {MAX_PASSWORD_LEN} characters."
        ));
    }
    Ok(())
}

/// Validate email format (basic check for `@` and non-empty parts).
///
/// # Errors
///
/// Returns a descriptive error message if the email is invalid.
pub fn validate_email(email: &str) -> Result<(), String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err("Email is required.".to_string());
    }
    let parts: Vec<&str> = trimmed.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() || !parts[1].contains('.') {
        return Err("Invalid email format.".to_string());
    }
    Ok(())
}

/// Emails compare case-insensitively; store and look them up in this form.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_policy() {
        assert!(validate_password("abcde").is_err());
        assert!(validate_password("abcdef").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
        assert_eq!(
            validate_password("12345"),
            Err("Password should be at least 6 characters.".to_string())
        );
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("new@x.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin@Example.COM "), "admin@example.com");
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("abcdef").unwrap_or_default();
        assert!(verify_password("abcdef", &hash).unwrap_or(false));
        assert!(!verify_password("abcdeg", &hash).unwrap_or(true));
    }
}
