//! Test harness for isolated test execution.
//!
//! Each `TestHarness` owns its own database (in memory, or a file inside a
//! temp directory) and a full set of services on top of it, plus helpers
//! for creating signed-in employees and admins.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use tempfile::TempDir;

use shiptrack::config::Config;
use shiptrack::db::role_repo::{self, RoleRow};
use shiptrack::db::Database;
use shiptrack::identity::{AuthError, IdentityProvider, ResetMailer};
use shiptrack::{Actor, Role, Services, Session};

pub const TEST_PASSWORD: &str = "correct-horse";

/// Captures reset tokens instead of sending them.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl MemoryMailer {
    /// The most recent token sent to `email`.
    pub fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .expect("mailer lock")
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mailer lock").len()
    }
}

impl ResetMailer for MemoryMailer {
    fn send_reset(&self, email: &str, token: &str) -> Result<(), AuthError> {
        self.sent
            .lock()
            .expect("mailer lock")
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}

/// Test harness providing an isolated store and services.
pub struct TestHarness {
    /// Keeps the database file alive for file-backed harnesses.
    temp_dir: Option<TempDir>,
    pub services: Services,
    pub mailer: Arc<MemoryMailer>,
}

impl TestHarness {
    /// Harness over an in-memory database with default config.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Harness over an in-memory database.
    pub fn with_config(config: Config) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let mailer = Arc::new(MemoryMailer::default());
        let services = Services::with_database(config, db, mailer.clone());
        Self {
            temp_dir: None,
            services,
            mailer,
        }
    }

    /// Harness over a database file in a fresh temp directory.
    pub fn file_backed(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("shiptrack.db");
        let db = Database::open(&path).expect("Failed to open database file");
        let mailer = Arc::new(MemoryMailer::default());
        let services = Services::with_database(config, db, mailer.clone());
        Self {
            temp_dir: Some(temp_dir),
            services,
            mailer,
        }
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_ref()
            .map(|dir| dir.path().join("shiptrack.db"))
    }

    pub fn db(&self) -> &Database {
        &self.services.db
    }

    /// Creates an account with a role record and signs it in.
    pub fn sign_up(&self, email: &str, name: Option<&str>, role: Role) -> (Session, Actor) {
        let password = SecretString::from(TEST_PASSWORD.to_string());
        let identity = self
            .services
            .identity
            .create_account(email, &password)
            .expect("Failed to create account");
        role_repo::upsert(
            self.db(),
            &RoleRow {
                uid: identity.uid,
                email: identity.email,
                name: name.map(str::to_string),
                role: role.as_str().to_string(),
                created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            },
        )
        .expect("Failed to write role record");

        self.services
            .login(email, &password, role)
            .expect("Failed to log in")
    }

    pub fn employee(&self, name: &str) -> Actor {
        let email = format!("{}@cbx.test", name.to_lowercase().replace(' ', "."));
        self.sign_up(&email, Some(name), Role::Employee).1
    }

    pub fn admin(&self) -> Actor {
        self.sign_up("admin@cbx.test", None, Role::Admin).1
    }
}
