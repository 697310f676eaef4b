//! Shipment tracking service: status changes with history, lookups,
//! deletion and live subscriptions.
//!
//! A status change is two writes, the shipment upsert and the history
//! append, with no transaction around them. When the second write fails
//! the shipment is already changed and the caller gets
//! [`TrackingError::HistoryWriteFailed`]; [`Tracker::check_history`] can
//! detect such shipments later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broadcast::{ChangeEvent, ChangeFeed, Collection, Snapshot, SubscriptionHandle};
use crate::config::{PoNumberMatching, TrackingConfig};
use crate::db::history_repo::{self, HistoryRow};
use crate::db::shipment_repo::{self, ShipmentRow, TrackingFields};
use crate::db::{format_timestamp, Database, DatabaseError};
use crate::error::{TrackingError, ValidationError};
use crate::identity::{Actor, Role};
use crate::shipment::{
    format_planning_date, normalize_po_number, HistoryEntry, Shipment, StatusChange,
};
use crate::status::Status;

/// Which field a public lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupType {
    #[serde(rename = "job", alias = "jobNumber")]
    JobNumber,
    #[serde(rename = "po", alias = "poNumber")]
    PoNumber,
}

/// Result of a successful status change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub shipment: Shipment,
    pub entry: HistoryEntry,
    /// True when this change created the shipment.
    pub created: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<BulkDeleteFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteFailure {
    pub job_number: String,
    pub error: String,
}

/// Whether a shipment's newest history entry matches its current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum HistoryConsistency {
    InSync,
    /// The shipment changed without a matching history entry.
    #[serde(rename_all = "camelCase")]
    MissingEntry {
        status: Status,
        last_updated: DateTime<Utc>,
        latest_entry: Option<HistoryEntry>,
    },
    NoShipment,
}

pub struct Tracker {
    db: Database,
    feed: ChangeFeed,
    policy: TrackingConfig,
}

impl Tracker {
    pub fn new(db: Database, feed: ChangeFeed, policy: TrackingConfig) -> Self {
        Self { db, feed, policy }
    }

    /// Sets the status of a shipment, creating it if it does not exist, and
    /// appends a history entry attributed to `actor`.
    ///
    /// Validation happens before anything is written. Creation-only fields
    /// (weight, packages, PO number, transit point) are ignored for
    /// existing shipments.
    pub fn record_status_change(
        &self,
        actor: &Actor,
        change: &StatusChange,
    ) -> Result<RecordOutcome, TrackingError> {
        let status = change.validate()?;
        let job_number = change.job_number.as_str();

        let existing = shipment_repo::find_by_job_number(&self.db, job_number)?;
        if let Some(current) = &existing {
            self.check_transition(&current.status, status)?;
            if change.has_details() {
                tracing::debug!(
                    job_number,
                    "Ignoring creation-only fields for existing shipment"
                );
            }
        }

        let now = format_timestamp(Utc::now());
        let planning_date = format_planning_date(change.planning_date);
        let fields = TrackingFields {
            status: status.as_str(),
            description: &change.description,
            planning_date: planning_date.as_deref(),
            last_updated: &now,
        };

        let created = match existing {
            Some(_) => {
                if shipment_repo::update_tracking(&self.db, job_number, &fields)? {
                    false
                } else {
                    // Deleted since the read above
                    self.insert_new(change, &fields)?;
                    true
                }
            }
            None => match self.insert_new(change, &fields) {
                Ok(()) => true,
                Err(e) if e.is_constraint_violation() => {
                    // Created concurrently; merge into it instead.
                    shipment_repo::update_tracking(&self.db, job_number, &fields)?;
                    false
                }
                Err(e) => return Err(e.into()),
            },
        };
        self.feed
            .publish(ChangeEvent::upserted(Collection::Jobs, job_number));

        let entry = HistoryRow {
            id: Uuid::new_v4().to_string(),
            job_number: job_number.to_string(),
            updated_by: actor.display_name.clone(),
            status: status.as_str().to_string(),
            description: change.description.clone(),
            planning_date,
            updated_at: now,
        };
        if let Err(source) = history_repo::append(&self.db, &entry) {
            tracing::error!(
                job_number,
                error = %source,
                "Shipment updated but history entry was not written"
            );
            return Err(TrackingError::HistoryWriteFailed {
                job_number: job_number.to_string(),
                source,
            });
        }

        tracing::info!(
            job_number,
            status = %status,
            created,
            by = %actor.uid,
            "Status recorded"
        );

        Ok(RecordOutcome {
            shipment: self.get_shipment(job_number)?,
            entry: HistoryEntry::from_row(&entry)?,
            created,
        })
    }

    fn insert_new(
        &self,
        change: &StatusChange,
        fields: &TrackingFields<'_>,
    ) -> Result<(), DatabaseError> {
        let po_number = change.po_number.clone().unwrap_or_default();
        let row = ShipmentRow {
            job_number: change.job_number.clone(),
            status: fields.status.to_string(),
            description: fields.description.to_string(),
            weight: change.weight.clone().unwrap_or_default(),
            num_packages: change.num_packages,
            po_number_key: normalize_po_number(&po_number),
            po_number,
            transit_point: change.transit_point.clone().unwrap_or_default(),
            planning_date: fields.planning_date.map(str::to_string),
            created_at: fields.last_updated.to_string(),
            last_updated: fields.last_updated.to_string(),
        };
        shipment_repo::insert(&self.db, &row)
    }

    fn check_transition(&self, stored: &str, next: Status) -> Result<(), ValidationError> {
        if self.policy.allow_status_regression {
            return Ok(());
        }
        // Unknown stored values and Delayed have no position, so any move
        // out of them is allowed.
        let from = stored.parse::<Status>().ok().and_then(|s| s.order_index());
        match (from, next.order_index()) {
            (Some(from_idx), Some(to_idx)) if to_idx < from_idx => {
                Err(ValidationError::StatusRegression {
                    from: stored.to_string(),
                    to: next.as_str().to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Public lookup. Returns `None` when nothing matches.
    ///
    /// Job numbers match exactly. PO numbers match according to
    /// `tracking.po_number_matching`; when several shipments share a PO
    /// number the most recently updated one wins.
    pub fn find_shipment(
        &self,
        lookup: LookupType,
        value: &str,
    ) -> Result<Option<Shipment>, TrackingError> {
        match lookup {
            LookupType::JobNumber => {
                if value.is_empty() {
                    return Err(ValidationError::MissingField("Job number").into());
                }
                shipment_repo::find_by_job_number(&self.db, value)?
                    .map(|row| Shipment::from_row(&row))
                    .transpose()
                    .map_err(Into::into)
            }
            LookupType::PoNumber => {
                if value.trim().is_empty() {
                    return Err(ValidationError::MissingField("PO number").into());
                }
                let rows = match self.policy.po_number_matching {
                    PoNumberMatching::CaseInsensitive => shipment_repo::find_by_po_number(
                        &self.db,
                        &normalize_po_number(value),
                        true,
                    )?,
                    PoNumberMatching::Exact => {
                        shipment_repo::find_by_po_number(&self.db, value, false)?
                    }
                };
                if rows.len() > 1 {
                    tracing::warn!(
                        po_number = value,
                        matches = rows.len(),
                        chosen = %rows[0].job_number,
                        "PO number matches several shipments"
                    );
                }
                rows.first()
                    .map(Shipment::from_row)
                    .transpose()
                    .map_err(Into::into)
            }
        }
    }

    pub fn get_shipment(&self, job_number: &str) -> Result<Shipment, TrackingError> {
        let row = shipment_repo::find_by_job_number(&self.db, job_number)?
            .ok_or_else(|| TrackingError::NotFound(job_number.to_string()))?;
        Ok(Shipment::from_row(&row)?)
    }

    /// History of a shipment, oldest first.
    pub fn history(&self, job_number: &str) -> Result<Vec<HistoryEntry>, TrackingError> {
        if shipment_repo::find_by_job_number(&self.db, job_number)?.is_none() {
            return Err(TrackingError::NotFound(job_number.to_string()));
        }
        let entries = history_repo::list_for_job(&self.db, job_number)?
            .iter()
            .map(HistoryEntry::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// All shipments, most recently updated first.
    pub fn list_shipments(&self) -> Result<Vec<Shipment>, TrackingError> {
        let shipments = shipment_repo::list_all(&self.db)?
            .iter()
            .map(Shipment::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shipments)
    }

    /// Deletes a shipment and its history. Returns how many history entries
    /// were removed.
    pub fn delete_shipment(&self, actor: &Actor, job_number: &str) -> Result<usize, TrackingError> {
        actor.require(Role::Admin)?;
        self.delete_one(job_number, &actor.uid)
    }

    fn delete_one(&self, job_number: &str, by: &str) -> Result<usize, TrackingError> {
        let removed_history = history_repo::delete_for_job(&self.db, job_number)?;
        let removed = shipment_repo::delete(&self.db, job_number)?;
        if !removed && removed_history == 0 {
            return Err(TrackingError::NotFound(job_number.to_string()));
        }

        self.feed
            .publish(ChangeEvent::deleted(Collection::Jobs, job_number));
        tracing::info!(job_number, removed_history, by, "Shipment deleted");
        Ok(removed_history)
    }

    /// Deletes each listed shipment independently and reports per-item
    /// outcomes. Duplicates in the input are deleted once.
    pub fn bulk_delete_shipments(
        &self,
        actor: &Actor,
        job_numbers: &[String],
    ) -> Result<BulkDeleteReport, TrackingError> {
        actor.require(Role::Admin)?;

        let mut report = BulkDeleteReport::default();
        let mut seen = std::collections::HashSet::new();
        for job_number in job_numbers {
            if !seen.insert(job_number.as_str()) {
                continue;
            }
            match self.delete_one(job_number, &actor.uid) {
                Ok(_) => report.deleted.push(job_number.clone()),
                Err(e) => report.failed.push(BulkDeleteFailure {
                    job_number: job_number.clone(),
                    error: e.to_string(),
                }),
            }
        }

        if !report.failed.is_empty() {
            tracing::warn!(
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                "Bulk delete finished with failures"
            );
        }
        Ok(report)
    }

    /// Compares a shipment with its newest history entry.
    pub fn check_history(&self, job_number: &str) -> Result<HistoryConsistency, TrackingError> {
        let Some(row) = shipment_repo::find_by_job_number(&self.db, job_number)? else {
            return Ok(HistoryConsistency::NoShipment);
        };
        let shipment = Shipment::from_row(&row)?;
        let latest = history_repo::latest_for_job(&self.db, job_number)?
            .map(|entry| HistoryEntry::from_row(&entry))
            .transpose()?;

        let in_sync = latest.as_ref().is_some_and(|entry| {
            entry.status == shipment.status && entry.updated_at == shipment.last_updated
        });
        if in_sync {
            return Ok(HistoryConsistency::InSync);
        }

        Ok(HistoryConsistency::MissingEntry {
            status: shipment.status,
            last_updated: shipment.last_updated,
            latest_entry: latest,
        })
    }

    /// Live snapshots of all shipments. See [`ChangeFeed::subscribe`].
    pub fn subscribe<F>(&self, on_snapshot: F) -> SubscriptionHandle
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        self.feed
            .subscribe(self.db.clone(), Collection::Jobs, on_snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tracker_with(policy: TrackingConfig) -> Tracker {
        let db = Database::open_in_memory().unwrap();
        Tracker::new(db, ChangeFeed::default(), policy)
    }

    fn tracker() -> Tracker {
        tracker_with(TrackingConfig::default())
    }

    fn employee() -> Actor {
        Actor {
            uid: "emp-1".to_string(),
            email: "dana@cbx.test".to_string(),
            display_name: "Dana".to_string(),
            role: Role::Employee,
        }
    }

    fn admin() -> Actor {
        Actor {
            uid: "adm-1".to_string(),
            email: "root@cbx.test".to_string(),
            display_name: "Admin".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_create_then_update() {
        let tracker = tracker();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let first = tracker
            .record_status_change(
                &employee(),
                &StatusChange::new("JOB1", "Pending")
                    .po_number("PO-9")
                    .weight("500 kg")
                    .planning_date(date),
            )
            .unwrap();
        assert!(first.created);
        assert_eq!(first.shipment.po_number, "PO-9");
        assert_eq!(first.entry.updated_by, "Dana");
        assert_eq!(first.entry.updated_at, first.shipment.last_updated);

        let second = tracker
            .record_status_change(
                &employee(),
                &StatusChange::new("JOB1", "Initiated")
                    .description("booked")
                    .weight("999 kg"),
            )
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.shipment.status, Status::Initiated);
        assert_eq!(second.shipment.weight, "500 kg");
        assert_eq!(second.shipment.planning_date, None);
        assert_eq!(second.shipment.created_at, first.shipment.created_at);
    }

    #[test]
    fn test_unknown_status_writes_nothing() {
        let tracker = tracker();
        let err = tracker
            .record_status_change(&employee(), &StatusChange::new("JOB1", "Lost"))
            .unwrap_err();
        assert!(matches!(
            err,
            TrackingError::Validation(ValidationError::UnknownStatus(_))
        ));
        assert!(tracker.list_shipments().unwrap().is_empty());
    }

    #[test]
    fn test_regression_policy() {
        let strict = tracker_with(TrackingConfig {
            allow_status_regression: false,
            ..TrackingConfig::default()
        });
        let actor = employee();
        strict
            .record_status_change(&actor, &StatusChange::new("J", "In Transit"))
            .unwrap();

        let err = strict
            .record_status_change(&actor, &StatusChange::new("J", "Initiated"))
            .unwrap_err();
        assert!(matches!(
            err,
            TrackingError::Validation(ValidationError::StatusRegression { .. })
        ));
        assert_eq!(strict.history("J").unwrap().len(), 1);

        strict
            .record_status_change(&actor, &StatusChange::new("J", "Delayed"))
            .unwrap();
        strict
            .record_status_change(&actor, &StatusChange::new("J", "Pending"))
            .unwrap();

        let lenient = tracker();
        lenient
            .record_status_change(&actor, &StatusChange::new("K", "Completed"))
            .unwrap();
        lenient
            .record_status_change(&actor, &StatusChange::new("K", "Pending"))
            .unwrap();
    }

    #[test]
    fn test_delete_requires_admin() {
        let tracker = tracker();
        tracker
            .record_status_change(&employee(), &StatusChange::new("JOB1", "Pending"))
            .unwrap();

        let err = tracker.delete_shipment(&employee(), "JOB1").unwrap_err();
        assert!(matches!(err, TrackingError::Auth(_)));
        assert_eq!(tracker.delete_shipment(&admin(), "JOB1").unwrap(), 1);
        assert!(matches!(
            tracker.delete_shipment(&admin(), "JOB1"),
            Err(TrackingError::NotFound(_))
        ));
    }

    #[test]
    fn test_bulk_delete_reports_each_item() {
        let tracker = tracker();
        for job in ["A", "B"] {
            tracker
                .record_status_change(&employee(), &StatusChange::new(job, "Pending"))
                .unwrap();
        }

        let report = tracker
            .bulk_delete_shipments(
                &admin(),
                &["A".to_string(), "missing".to_string(), "B".to_string(), "A".to_string()],
            )
            .unwrap();
        assert_eq!(report.deleted, vec!["A", "B"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].job_number, "missing");
    }

    #[test]
    fn test_check_history() {
        let tracker = tracker();
        assert_eq!(
            tracker.check_history("NOPE").unwrap(),
            HistoryConsistency::NoShipment
        );

        tracker
            .record_status_change(&employee(), &StatusChange::new("JOB1", "Pending"))
            .unwrap();
        assert_eq!(
            tracker.check_history("JOB1").unwrap(),
            HistoryConsistency::InSync
        );

        // Simulate a lost history write
        let later = format_timestamp(Utc::now() + chrono::Duration::seconds(5));
        shipment_repo::update_tracking(
            &tracker.db,
            "JOB1",
            &TrackingFields {
                status: "Initiated",
                description: "",
                planning_date: None,
                last_updated: &later,
            },
        )
        .unwrap();

        match tracker.check_history("JOB1").unwrap() {
            HistoryConsistency::MissingEntry {
                status,
                latest_entry,
                ..
            } => {
                assert_eq!(status, Status::Initiated);
                assert_eq!(latest_entry.unwrap().status, Status::Pending);
            }
            other => panic!("expected MissingEntry, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_rejects_empty_values() {
        let tracker = tracker();
        assert!(tracker.find_shipment(LookupType::JobNumber, "").is_err());
        assert!(tracker.find_shipment(LookupType::PoNumber, "  ").is_err());
    }

    #[test]
    fn test_lookup_type_serde() {
        let job: LookupType = serde_json::from_str("\"job\"").unwrap();
        let po: LookupType = serde_json::from_str("\"poNumber\"").unwrap();
        assert_eq!(job, LookupType::JobNumber);
        assert_eq!(po, LookupType::PoNumber);
    }
}
