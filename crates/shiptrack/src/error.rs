use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::identity::AuthError;
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum ShiptrackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Administration error: {0}")]
    Admin(#[from] AdminError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid value for environment variable {name}: {reason}")]
    InvalidEnv { name: String, reason: String },
}

/// Input rejected before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Unknown status '{0}'")]
    UnknownStatus(String),

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("Invalid job number '{value}': {reason}")]
    InvalidJobNumber { value: String, reason: &'static str },

    #[error("Status cannot move back from '{from}' to '{to}'")]
    StatusRegression { from: String, to: String },

    #[error("Page size {0} is not one of the allowed options")]
    PageSizeNotAllowed(usize),

    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("Administrators cannot remove their own account")]
    SelfRemoval,
}

#[derive(Error, Debug)]
pub enum TrackingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Shipment not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),

    /// The shipment write went through but its history entry did not.
    #[error("Shipment {job_number} was updated but its history entry could not be written: {source}")]
    HistoryWriteFailed {
        job_number: String,
        #[source]
        source: DatabaseError,
    },
}

impl TrackingError {
    /// True when the shipment itself was persisted despite the error.
    pub fn is_partial(&self) -> bool {
        matches!(self, TrackingError::HistoryWriteFailed { .. })
    }
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Employee not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, ShiptrackError>;
