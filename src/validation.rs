use crate::error::{Result, SocialError};

/// Validation utilities for input sanitization and edge case handling
///
/// All checks run before any storage access and surface as `Validation`
/// errors.
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a registration password
    pub fn validate_password(password: &str, min_len: usize) -> Result<()> {
        if password.len() < min_len {
            return Err(SocialError::Validation(format!(
                "Password must contain at least {min_len} characters"
            )));
        }

        if password.len() > 1024 {
            return Err(SocialError::Validation(
                "Password too long (max 1024 characters)".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate a username
    ///
    /// `@` is reserved as the email/username discriminator in login input, so
    /// usernames must not contain it.
    pub fn validate_username(username: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(SocialError::Validation(
                "Username cannot be empty".to_string(),
            ));
        }

        if username.contains('@') {
            return Err(SocialError::Validation(
                "Username must not contain @".to_string(),
            ));
        }

        if username.len() > 100 {
            return Err(SocialError::Validation(
                "Username too long (max 100 characters)".to_string(),
            ));
        }

        if username.contains('\0') || username.contains('\r') || username.contains('\n') {
            return Err(SocialError::Validation(
                "Username contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(SocialError::Validation("Email cannot be empty".to_string()));
        }

        if email.len() > 254 {
            return Err(SocialError::Validation(
                "Email too long (max 254 characters)".to_string(),
            ));
        }

        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 {
            return Err(SocialError::Validation(
                "Email must have exactly one @ symbol".to_string(),
            ));
        }

        let local_part = parts[0];
        let domain_part = parts[1];

        if local_part.is_empty() || local_part.len() > 64 {
            return Err(SocialError::Validation("Email local part invalid".to_string()));
        }

        if domain_part.is_empty() || !domain_part.contains('.') {
            return Err(SocialError::Validation("Email domain invalid".to_string()));
        }

        Ok(())
    }

    /// Validate a sampling count against the configured ceiling
    pub fn validate_sample_count(count: i64, max_count: i64) -> Result<()> {
        if count > max_count {
            return Err(SocialError::Validation(format!(
                "count too large (max {max_count})"
            )));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_password_rejected() {
        assert!(InputValidator::validate_password("12345", 6).is_err());
        assert!(InputValidator::validate_password("123456", 6).is_ok());
    }

    #[test]
    fn test_username_with_at_rejected() {
        assert!(InputValidator::validate_username("some@user").is_err());
        assert!(InputValidator::validate_username("some_user").is_ok());
        assert!(InputValidator::validate_username("   ").is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(InputValidator::validate_email("user@example.com").is_ok());
        assert!(InputValidator::validate_email("userexample.com").is_err());
        assert!(InputValidator::validate_email("user@@example.com").is_err());
        assert!(InputValidator::validate_email("user@nodomain").is_err());
    }

    #[test]
    fn test_sanitize_text_strips_control_chars() {
        assert_eq!(InputValidator::sanitize_text("  a\u{0} b  "), "a b");
    }
}
