use regex::Regex;
use std::sync::OnceLock;

use super::AuthError;

const MAX_EMAIL_LEN: usize = 254;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
        )
        .expect("Invalid regex pattern defined in code")
    })
}

/// Display names are trimmed; what remains must not be empty.
pub fn validate_name(name: &str) -> Result<&str, AuthError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AuthError::Validation("Name is required".to_string()));
    }
    Ok(trimmed)
}

/// Emails are matched as given; no trimming or case folding.
pub fn validate_email(email: &str) -> Result<&str, AuthError> {
    if email.is_empty() {
        return Err(AuthError::Validation("Email is required".to_string()));
    }

    if email.len() > MAX_EMAIL_LEN || !email_regex().is_match(email) {
        return Err(AuthError::Validation("Email is not valid".to_string()));
    }

    Ok(email)
}

pub fn validate_new_password(password: &str, min_length: usize) -> Result<&str, AuthError> {
    if password.chars().count() < min_length {
        return Err(AuthError::Validation(format!(
            "Password must be at least {min_length} characters"
        )));
    }
    Ok(password)
}

/// Login only requires a password to be present; the length policy applies
/// at signup.
pub fn validate_login_password(password: &str) -> Result<&str, AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation("Password is required".to_string()));
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("Alice").unwrap(), "Alice");
        assert_eq!(validate_name("  Alice  ").unwrap(), "Alice");
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@x.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("alice@localhost").is_err());
        assert!(validate_email("alice @x.com").is_err());
        assert!(validate_email(" alice@x.com").is_err());
        assert!(validate_email(&format!("{}@x.com", "a".repeat(250))).is_err());
    }

    #[test]
    fn test_validate_email_keeps_case() {
        assert_eq!(validate_email("Alice@X.com").unwrap(), "Alice@X.com");
    }

    #[test]
    fn test_validate_new_password() {
        assert!(validate_new_password("secret", 6).is_ok());
        assert!(validate_new_password("secre", 6).is_err());
        assert!(validate_new_password("", 6).is_err());
        // counted in characters, not bytes
        assert!(validate_new_password("ééééé", 6).is_err());
    }

    #[test]
    fn test_validate_login_password() {
        assert!(validate_login_password("x").is_ok());
        assert!(validate_login_password("").is_err());
    }
}
