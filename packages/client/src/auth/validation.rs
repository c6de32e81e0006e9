use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::error::Alert;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 3;

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in both email and password")]
    MissingCredentials,
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Passwords don't match")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters long")]
    WeakPassword,
    #[error("Username must be at least 3 characters long")]
    InvalidUsername,
}

impl ValidationError {
    pub fn title(&self) -> &'static str {
        match self {
            ValidationError::MissingCredentials | ValidationError::MissingFields => {
                "Missing Information"
            }
            ValidationError::InvalidEmail => "Invalid Email",
            ValidationError::PasswordMismatch => "Password Mismatch",
            ValidationError::WeakPassword => "Weak Password",
            ValidationError::InvalidUsername => "Invalid Username",
        }
    }
}

impl From<ValidationError> for Alert {
    fn from(err: ValidationError) -> Self {
        Alert::new(err.title(), err.to_string())
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() || self.password.trim().is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Checks run in a fixed order; the first failure wins.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            &self.username,
            &self.email,
            &self.password,
            &self.confirm_password,
        ];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(ValidationError::MissingFields);
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::WeakPassword);
        }
        if self.username.chars().count() < MIN_USERNAME_LEN {
            return Err(ValidationError::InvalidUsername);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(username: &str, email: &str, password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn email_pattern_matches_basic_addresses() {
        assert!(is_valid_email("reader@example.com"));
        assert!(!is_valid_email("reader@example"));
        assert!(!is_valid_email("reader example@x.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn login_requires_both_fields() {
        assert_eq!(
            LoginForm::new("  ", "secret").validate(),
            Err(ValidationError::MissingCredentials)
        );
        assert_eq!(
            LoginForm::new("not-an-email", "secret").validate(),
            Err(ValidationError::InvalidEmail)
        );
        assert!(LoginForm::new("a@b.co", "secret").validate().is_ok());
    }

    #[test]
    fn signup_checks_in_order() {
        assert_eq!(
            signup("", "a@b.co", "secret", "secret").validate(),
            Err(ValidationError::MissingFields)
        );
        assert_eq!(
            signup("bob", "bad", "secret", "secret").validate(),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            signup("bob", "a@b.co", "secret", "secreT").validate(),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            signup("bob", "a@b.co", "short", "short").validate(),
            Err(ValidationError::WeakPassword)
        );
        assert_eq!(
            signup("bo", "a@b.co", "secret", "secret").validate(),
            Err(ValidationError::InvalidUsername)
        );
        assert!(signup("bob", "a@b.co", "secret", "secret").validate().is_ok());
    }

    #[test]
    fn converts_into_titled_alert() {
        let alert: Alert = ValidationError::PasswordMismatch.into();
        assert_eq!(alert.title, "Password Mismatch");
        assert_eq!(alert.message, "Passwords don't match");
    }
}
