//! Identity provider backed by the local SQLite store.
//!
//! Accounts live in the `accounts` table. Sessions and password-reset
//! tokens are kept in memory with a time-to-live, so a restart signs
//! everybody out.

use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use moka::sync::Cache;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use super::{normalize_email, validate_email, AuthError, Identity, IdentityProvider, Session};
use crate::config::{AuthConfig, MAX_TTL_MINUTES};
use crate::db::account_repo::{self, AccountRow};
use crate::db::{format_timestamp, Database};
use crate::error::ValidationError;
use crate::identity::mailer::ResetMailer;
use crate::sanitize::redact_email;

const MAX_SESSIONS: u64 = 10_000;

pub struct LocalIdentityProvider {
    db: Database,
    sessions: Cache<String, Session>,
    reset_tokens: Cache<String, String>,
    mailer: Arc<dyn ResetMailer>,
    min_password_length: usize,
}

impl LocalIdentityProvider {
    pub fn new(db: Database, config: &AuthConfig, mailer: Arc<dyn ResetMailer>) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_live(ttl(config.session_ttl_minutes))
            .build();
        let reset_tokens = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_live(ttl(config.reset_token_ttl_minutes))
            .build();

        Self {
            db,
            sessions,
            reset_tokens,
            mailer,
            min_password_length: config.min_password_length,
        }
    }

    /// Sets a new password using a token from a reset email.
    ///
    /// The token is single-use. All open sessions of the account are ended.
    pub fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &SecretString,
    ) -> Result<(), AuthError> {
        let uid = self
            .reset_tokens
            .get(token)
            .ok_or(AuthError::InvalidResetToken)?;
        self.check_password_strength(new_password)?;

        let hash = hash_password(new_password.expose_secret())?;
        let now = format_timestamp(Utc::now());
        if !account_repo::update_password(&self.db, &uid, &hash, &now)? {
            self.reset_tokens.invalidate(token);
            return Err(AuthError::InvalidResetToken);
        }

        self.reset_tokens.invalidate(token);
        let revoked = self.revoke_sessions(&uid);
        tracing::info!(uid = %uid, revoked, "Password reset completed");
        Ok(())
    }

    /// Ends every session of a user. Returns how many were open.
    pub fn revoke_sessions(&self, uid: &str) -> usize {
        let tokens: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.identity.uid == uid)
            .map(|(token, _)| token.as_ref().clone())
            .collect();
        for token in &tokens {
            self.sessions.invalidate(token);
        }
        tokens.len()
    }

    fn check_password_strength(&self, password: &SecretString) -> Result<(), AuthError> {
        if password.expose_secret().chars().count() < self.min_password_length {
            return Err(ValidationError::WeakPassword {
                min: self.min_password_length,
            }
            .into());
        }
        Ok(())
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let account = account_repo::find_by_email(&self.db, &email)?;

        let account = match account {
            Some(account)
                if verify_password(password.expose_secret(), &account.password_hash) =>
            {
                account
            }
            _ => {
                tracing::debug!(email = %redact_email(&email), "Sign-in rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            identity: Identity {
                uid: account.uid,
                email: account.email,
            },
            issued_at: Utc::now(),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(session)
    }

    fn sign_out(&self, token: &str) {
        self.sessions.invalidate(token);
    }

    fn current_session_user(&self, token: &str) -> Option<Identity> {
        self.sessions.get(token).map(|session| session.identity)
    }

    fn send_password_reset_email(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let account = account_repo::find_by_email(&self.db, &email)?
            .ok_or_else(|| AuthError::UnknownAccount(email.clone()))?;

        let token = Uuid::new_v4().simple().to_string();
        self.reset_tokens.insert(token.clone(), account.uid);
        self.mailer.send_reset(&email, &token)
    }

    fn create_account(
        &self,
        email: &str,
        temp_password: &SecretString,
    ) -> Result<Identity, AuthError> {
        validate_email(email)?;
        self.check_password_strength(temp_password)?;

        let email = normalize_email(email);
        if account_repo::find_by_email(&self.db, &email)?.is_some() {
            return Err(AuthError::EmailInUse(email));
        }

        let now = format_timestamp(Utc::now());
        let row = AccountRow {
            uid: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash_password(temp_password.expose_secret())?,
            created_at: now.clone(),
            updated_at: now,
        };
        account_repo::insert(&self.db, &row)?;

        tracing::info!(uid = %row.uid, email = %redact_email(&email), "Account created");
        Ok(Identity {
            uid: row.uid,
            email,
        })
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let email = normalize_email(email);
        Ok(account_repo::find_by_email(&self.db, &email)?.map(|account| Identity {
            uid: account.uid,
            email: account.email,
        }))
    }
}

/// Cache lifetime for a TTL in minutes, capped so moka never sees an
/// overflowing duration.
fn ttl(minutes: u64) -> Duration {
    Duration::from_secs(minutes.min(MAX_TTL_MINUTES).saturating_mul(60))
}

/// Argon2id with a random salt, encoded as a PHC string.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl ResetMailer for CapturingMailer {
        fn send_reset(&self, email: &str, token: &str) -> Result<(), AuthError> {
            self.sent
                .lock()
                .unwrap()
                .push((email.to_string(), token.to_string()));
            Ok(())
        }
    }

    fn provider() -> (LocalIdentityProvider, Arc<CapturingMailer>) {
        let db = Database::open_in_memory().unwrap();
        let mailer = Arc::new(CapturingMailer::default());
        let provider = LocalIdentityProvider::new(db, &AuthConfig::default(), mailer.clone());
        (provider, mailer)
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn test_hashes_are_salted_phc_strings() {
        let a = hash_password("hunter22").unwrap();
        let b = hash_password("hunter22").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);

        assert!(verify_password("hunter22", &a));
        assert!(verify_password("hunter22", &b));
        assert!(!verify_password("hunter23", &a));
    }

    #[test]
    fn test_legacy_hex_hash_never_verifies() {
        let hex = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
        assert!(!verify_password("test", hex));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn test_huge_ttls_are_capped() {
        let db = Database::open_in_memory().unwrap();
        let config = AuthConfig {
            session_ttl_minutes: u64::MAX,
            reset_token_ttl_minutes: u64::MAX / 60 + 1,
            ..AuthConfig::default()
        };
        let provider =
            LocalIdentityProvider::new(db, &config, Arc::new(CapturingMailer::default()));
        provider
            .create_account("dana@cbx.test", &secret("temporary-pw"))
            .unwrap();
        let session = provider
            .sign_in("dana@cbx.test", &secret("temporary-pw"))
            .unwrap();
        assert!(provider.current_session_user(&session.token).is_some());

        assert_eq!(ttl(u64::MAX), Duration::from_secs(MAX_TTL_MINUTES * 60));
        assert_eq!(ttl(30), Duration::from_secs(1800));
    }

    #[test]
    fn test_create_and_sign_in() {
        let (provider, _) = provider();
        let identity = provider
            .create_account("Dana@CBX.test", &secret("temporary-pw"))
            .unwrap();
        assert_eq!(identity.email, "dana@cbx.test");

        let session = provider
            .sign_in(" dana@cbx.test", &secret("temporary-pw"))
            .unwrap();
        assert_eq!(session.identity, identity);
        assert_eq!(
            provider.current_session_user(&session.token),
            Some(identity)
        );

        provider.sign_out(&session.token);
        assert!(provider.current_session_user(&session.token).is_none());
    }

    #[test]
    fn test_wrong_password_and_unknown_email_look_the_same() {
        let (provider, _) = provider();
        provider
            .create_account("dana@cbx.test", &secret("temporary-pw"))
            .unwrap();

        let wrong = provider.sign_in("dana@cbx.test", &secret("nope-nope"));
        let unknown = provider.sign_in("eli@cbx.test", &secret("temporary-pw"));
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let (provider, _) = provider();
        provider
            .create_account("dana@cbx.test", &secret("temporary-pw"))
            .unwrap();
        let err = provider
            .create_account("DANA@cbx.test", &secret("temporary-pw"))
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailInUse(_)));
    }

    #[test]
    fn test_short_password_rejected() {
        let (provider, _) = provider();
        let err = provider
            .create_account("dana@cbx.test", &secret("short"))
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation(ValidationError::WeakPassword { min: 8 })
        ));
    }

    #[test]
    fn test_password_reset_flow() {
        let (provider, mailer) = provider();
        provider
            .create_account("dana@cbx.test", &secret("temporary-pw"))
            .unwrap();
        let old_session = provider
            .sign_in("dana@cbx.test", &secret("temporary-pw"))
            .unwrap();

        provider.send_password_reset_email("dana@cbx.test").unwrap();
        let (to, token) = mailer.sent.lock().unwrap()[0].clone();
        assert_eq!(to, "dana@cbx.test");

        provider
            .confirm_password_reset(&token, &secret("brand-new-pw"))
            .unwrap();

        assert!(provider.current_session_user(&old_session.token).is_none());
        assert!(provider
            .sign_in("dana@cbx.test", &secret("temporary-pw"))
            .is_err());
        assert!(provider
            .sign_in("dana@cbx.test", &secret("brand-new-pw"))
            .is_ok());

        // Single use
        let again = provider.confirm_password_reset(&token, &secret("another-pw-1"));
        assert!(matches!(again, Err(AuthError::InvalidResetToken)));
    }

    #[test]
    fn test_reset_for_unknown_email() {
        let (provider, mailer) = provider();
        let err = provider
            .send_password_reset_email("ghost@cbx.test")
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownAccount(_)));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_find_by_email() {
        let (provider, _) = provider();
        assert!(provider.find_by_email("dana@cbx.test").unwrap().is_none());
        let created = provider
            .create_account("dana@cbx.test", &secret("temporary-pw"))
            .unwrap();
        assert_eq!(
            provider.find_by_email("DANA@cbx.test").unwrap(),
            Some(created)
        );
    }
}
