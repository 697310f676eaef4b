//! Typed shipment records and the inputs that create or change them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::history_repo::HistoryRow;
use crate::db::shipment_repo::ShipmentRow;
use crate::db::{parse_timestamp, DatabaseError};
use crate::error::ValidationError;
use crate::status::Status;

const MAX_JOB_NUMBER_LEN: usize = 64;
const PLANNING_DATE_FORMAT: &str = "%Y-%m-%d";

/// A shipment, keyed by its job number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub job_number: String,
    pub status: Status,
    pub description: String,
    /// Free text as entered, e.g. "1200 kg".
    pub weight: String,
    pub num_packages: Option<u32>,
    pub po_number: String,
    pub transit_point: String,
    pub planning_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Shipment {
    pub fn from_row(row: &ShipmentRow) -> Result<Self, DatabaseError> {
        Ok(Self {
            job_number: row.job_number.clone(),
            status: parse_stored_status(&row.status)?,
            description: row.description.clone(),
            weight: row.weight.clone(),
            num_packages: row.num_packages,
            po_number: row.po_number.clone(),
            transit_point: row.transit_point.clone(),
            planning_date: parse_planning_date(row.planning_date.as_deref())?,
            created_at: parse_timestamp(&row.created_at)?,
            last_updated: parse_timestamp(&row.last_updated)?,
        })
    }

    /// Active shipments are everything not yet completed, delayed included.
    pub fn is_active(&self) -> bool {
        !self.status.is_completed()
    }
}

/// One audit record of a shipment mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub job_number: String,
    /// Display name of the employee or admin who made the change.
    pub updated_by: String,
    pub status: Status,
    pub description: String,
    pub planning_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_row(row: &HistoryRow) -> Result<Self, DatabaseError> {
        Ok(Self {
            id: row.id.clone(),
            job_number: row.job_number.clone(),
            updated_by: row.updated_by.clone(),
            status: parse_stored_status(&row.status)?,
            description: row.description.clone(),
            planning_date: parse_planning_date(row.planning_date.as_deref())?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// A request to set a shipment's status, creating the shipment if needed.
///
/// `weight`, `num_packages`, `po_number` and `transit_point` are only read
/// when the shipment does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatusChange {
    pub job_number: String,
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub planning_date: Option<NaiveDate>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub num_packages: Option<u32>,
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub transit_point: Option<String>,
}

impl StatusChange {
    pub fn new(job_number: &str, status: &str) -> Self {
        Self {
            job_number: job_number.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn planning_date(mut self, date: NaiveDate) -> Self {
        self.planning_date = Some(date);
        self
    }

    pub fn weight(mut self, weight: &str) -> Self {
        self.weight = Some(weight.to_string());
        self
    }

    pub fn num_packages(mut self, count: u32) -> Self {
        self.num_packages = Some(count);
        self
    }

    pub fn po_number(mut self, po_number: &str) -> Self {
        self.po_number = Some(po_number.to_string());
        self
    }

    pub fn transit_point(mut self, transit_point: &str) -> Self {
        self.transit_point = Some(transit_point.to_string());
        self
    }

    /// True if any creation-only field was supplied.
    pub fn has_details(&self) -> bool {
        self.weight.is_some()
            || self.num_packages.is_some()
            || self.po_number.is_some()
            || self.transit_point.is_some()
    }

    /// Checks required fields and the status value. Nothing is written
    /// unless this succeeds.
    pub fn validate(&self) -> Result<Status, ValidationError> {
        validate_job_number(&self.job_number)?;
        if self.status.trim().is_empty() {
            return Err(ValidationError::MissingField("Status"));
        }
        self.status.parse::<Status>()
    }
}

/// Rules for job numbers, which double as primary keys and URL segments.
pub fn validate_job_number(job_number: &str) -> Result<(), ValidationError> {
    if job_number.trim().is_empty() {
        return Err(ValidationError::MissingField("Job number"));
    }
    if job_number.trim() != job_number {
        return Err(ValidationError::InvalidJobNumber {
            value: job_number.to_string(),
            reason: "must not start or end with whitespace",
        });
    }
    if job_number.len() > MAX_JOB_NUMBER_LEN {
        return Err(ValidationError::InvalidJobNumber {
            value: job_number.to_string(),
            reason: "is longer than 64 characters",
        });
    }
    if job_number.chars().any(|c| c == '/' || c.is_control()) {
        return Err(ValidationError::InvalidJobNumber {
            value: job_number.to_string(),
            reason: "must not contain '/' or control characters",
        });
    }
    Ok(())
}

/// Lookup key for case-insensitive PO number matching.
pub fn normalize_po_number(po_number: &str) -> String {
    po_number.trim().to_lowercase()
}

pub(crate) fn format_planning_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(PLANNING_DATE_FORMAT).to_string())
}

fn parse_planning_date(raw: Option<&str>) -> Result<Option<NaiveDate>, DatabaseError> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, PLANNING_DATE_FORMAT)
            .map(Some)
            .map_err(|e| DatabaseError::InvalidValue {
                column: "planning_date",
                value: s.to_string(),
                reason: e.to_string(),
            }),
    }
}

fn parse_stored_status(raw: &str) -> Result<Status, DatabaseError> {
    raw.parse().map_err(|e: ValidationError| DatabaseError::InvalidValue {
        column: "status",
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
