//! Authentication error types.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::ValidationError;

/// Errors from sign-in, sessions and account management.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No role data found for this user")]
    NoRoleRecord,

    #[error("Unauthorized access for this role")]
    UnauthorizedRole,

    #[error("Not signed in or session expired")]
    NotSignedIn,

    #[error("No account found for {0}")]
    UnknownAccount(String),

    #[error("An account already exists for {0}")]
    EmailInUse(String),

    #[error("Password reset link is invalid or has expired")]
    InvalidResetToken,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to deliver email: {0}")]
    Mailer(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),
}

impl AuthError {
    /// Message safe to show on the login form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password.".to_string(),
            AuthError::NoRoleRecord => "No role data found for this user.".to_string(),
            AuthError::UnauthorizedRole => "Unauthorized access for this role.".to_string(),
            AuthError::NotSignedIn => "Please sign in again.".to_string(),
            AuthError::UnknownAccount(_) | AuthError::Mailer(_) => {
                "Failed to send reset email. Make sure the email is correct.".to_string()
            }
            AuthError::EmailInUse(_) | AuthError::InvalidResetToken => format!("{}.", self),
            AuthError::Validation(e) => format!("{}.", e),
            AuthError::PasswordHash(_) | AuthError::Store(_) => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_hide_internals() {
        let store = AuthError::Store(DatabaseError::LockPoisoned);
        assert_eq!(
            store.user_message(),
            "An unexpected error occurred. Please try again."
        );

        let unknown = AuthError::UnknownAccount("x@cbx.test".to_string());
        assert!(!unknown.user_message().contains("x@cbx.test"));
    }

    #[test]
    fn test_validation_message() {
        let err = AuthError::from(ValidationError::WeakPassword { min: 8 });
        assert_eq!(err.user_message(), "Password must be at least 8 characters.");
    }
}
