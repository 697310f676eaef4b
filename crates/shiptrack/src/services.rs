//! Wiring of the store, change feed and services behind one handle.

use std::sync::Arc;

use secrecy::SecretString;

use crate::admin::EmployeeDirectory;
use crate::broadcast::ChangeFeed;
use crate::config::Config;
use crate::db::Database;
use crate::error::ConfigError;
use crate::identity::{self, Actor, AuthError, LocalIdentityProvider, LogMailer, ResetMailer, Role, Session};
use crate::tracking::Tracker;

/// Everything a front end needs. Cloning is cheap.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub db: Database,
    pub feed: ChangeFeed,
    pub tracker: Arc<Tracker>,
    pub identity: Arc<LocalIdentityProvider>,
    pub directory: Arc<EmployeeDirectory>,
}

impl Services {
    /// Opens the configured database and builds the services on it, with
    /// reset links going to the log.
    pub fn open(config: Config) -> crate::Result<Self> {
        let path = config
            .resolved_database_path()
            .ok_or_else(|| ConfigError::Validation {
                message: "database_path is not set and no home directory was found".to_string(),
            })?;
        let db = Database::open(&path)?;
        Ok(Self::with_database(config, db, Arc::new(LogMailer)))
    }

    pub fn with_database(config: Config, db: Database, mailer: Arc<dyn ResetMailer>) -> Self {
        let feed = ChangeFeed::default();
        let identity = Arc::new(LocalIdentityProvider::new(db.clone(), &config.auth, mailer));
        let tracker = Arc::new(Tracker::new(
            db.clone(),
            feed.clone(),
            config.tracking.clone(),
        ));
        let directory = Arc::new(EmployeeDirectory::new(
            db.clone(),
            identity.clone(),
            feed.clone(),
        ));

        Self {
            config: Arc::new(config),
            db,
            feed,
            tracker,
            identity,
            directory,
        }
    }

    /// Creates the configured bootstrap admin if no admin exists yet.
    pub fn bootstrap(&self) -> crate::Result<()> {
        let Some(bootstrap) = &self.config.bootstrap_admin else {
            return Ok(());
        };
        if self.directory.ensure_bootstrap_admin(bootstrap)?.is_none() {
            tracing::debug!("An admin already exists, skipping bootstrap");
        }
        Ok(())
    }

    pub fn login(
        &self,
        email: &str,
        password: &SecretString,
        requested_role: Role,
    ) -> Result<(Session, Actor), AuthError> {
        identity::login(self.identity.as_ref(), &self.db, email, password, requested_role)
    }

    pub fn authenticate(&self, token: &str) -> Result<Actor, AuthError> {
        identity::authenticate(self.identity.as_ref(), &self.db, token)
    }
}
