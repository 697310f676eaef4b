pub mod admin;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod listing;
pub mod logging;
pub mod sanitize;
pub mod secrets;
pub mod services;
pub mod shipment;
pub mod status;
pub mod tracking;

pub use admin::{Employee, EmployeeDirectory, NewEmployee};
pub use broadcast::{ChangeEvent, ChangeFeed, Collection, Snapshot, SubscriptionHandle};
pub use config::{load_config, load_effective_config, Config};
pub use db::Database;
pub use error::{AdminError, ConfigError, Result, ShiptrackError, TrackingError, ValidationError};
pub use identity::{Actor, AuthError, IdentityProvider, LocalIdentityProvider, Role, Session};
pub use listing::{ListQuery, ListView, Page, Partition, SortOrder};
pub use logging::init_logging;
pub use secrets::{resolve_secret, SecretError};
pub use services::Services;
pub use shipment::{HistoryEntry, Shipment, StatusChange};
pub use status::{Progress, StageState, Status};
pub use tracking::{BulkDeleteReport, HistoryConsistency, LookupType, RecordOutcome, Tracker};
