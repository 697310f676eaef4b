//! Identity: accounts, sessions and the employee/admin role of a session.
//!
//! The [`IdentityProvider`] trait is the contract the rest of the crate
//! uses; [`LocalIdentityProvider`] implements it on top of the local store.
//! Roles are not part of the provider. They live in the `roles` collection
//! and are resolved per request by [`authenticate`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod local;
pub mod login;
pub mod mailer;

pub use error::AuthError;
pub use local::LocalIdentityProvider;
pub use login::{authenticate, login, Actor};
pub use mailer::{LogMailer, ResetMailer};

use crate::error::ValidationError;

/// Access level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }

    /// Greeting name used when a role record carries no display name.
    pub fn default_display_name(&self) -> &'static str {
        match self {
            Role::Employee => "Employee",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

/// A signed-in user as the identity provider knows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// An active session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub identity: Identity,
    pub issued_at: DateTime<Utc>,
}

/// Contract of the identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Checks credentials and opens a session.
    fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, AuthError>;

    /// Ends a session. Unknown tokens are ignored.
    fn sign_out(&self, token: &str);

    /// The user behind a session token, if it is still valid.
    fn current_session_user(&self, token: &str) -> Option<Identity>;

    /// Sends a password-reset link to the account's address.
    fn send_password_reset_email(&self, email: &str) -> Result<(), AuthError>;

    /// Creates an account with a temporary password.
    fn create_account(&self, email: &str, temp_password: &SecretString)
        -> Result<Identity, AuthError>;

    /// Looks up an account by email.
    fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError>;
}

/// Canonical form of an email address for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: one `@` with something on both sides and a dot in
/// the domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let normalized = normalize_email(email);
    if normalized.is_empty() {
        return Err(ValidationError::MissingField("Email"));
    }
    match normalized.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !normalized.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(ValidationError::InvalidEmail(email.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Employee.as_str(), "employee");
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("dana@cbx.test").is_ok());
        assert!(validate_email("  Dana@CBX.test ").is_ok());
        assert_eq!(
            validate_email(""),
            Err(ValidationError::MissingField("Email"))
        );
        for bad in ["dana", "@cbx.test", "dana@cbx", "dana@.test", "da na@cbx.test", "a@b@c.d"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }
}
