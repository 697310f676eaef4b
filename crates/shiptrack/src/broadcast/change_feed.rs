//! Change feed with snapshot subscriptions.
//!
//! Writers publish a [`ChangeEvent`] after every mutation. Subscribers get
//! the full collection as a [`Snapshot`] once on subscribe and again after
//! every change to that collection. Snapshots are reloaded from the store,
//! so a lagging subscriber only misses intermediate states.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::admin::Employee;
use crate::db::{role_repo, shipment_repo, Database, DatabaseError};
use crate::shipment::Shipment;

/// Collections that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Shipments, keyed by job number.
    Jobs,
    /// Employee role records, keyed by user id.
    Roles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// A single document changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub collection: Collection,
    pub key: String,
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn upserted(collection: Collection, key: &str) -> Self {
        Self {
            collection,
            key: key.to_string(),
            kind: ChangeKind::Upserted,
            timestamp: Utc::now(),
        }
    }

    pub fn deleted(collection: Collection, key: &str) -> Self {
        Self {
            collection,
            key: key.to_string(),
            kind: ChangeKind::Deleted,
            timestamp: Utc::now(),
        }
    }
}

/// Full contents of a collection at one point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "collection", content = "documents", rename_all = "snake_case")]
pub enum Snapshot {
    Jobs(Vec<Shipment>),
    Roles(Vec<Employee>),
}

impl Snapshot {
    pub fn collection(&self) -> Collection {
        match self {
            Snapshot::Jobs(_) => Collection::Jobs,
            Snapshot::Roles(_) => Collection::Roles,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Snapshot::Jobs(docs) => docs.len(),
            Snapshot::Roles(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loads the current snapshot of a collection.
pub fn load_snapshot(db: &Database, collection: Collection) -> Result<Snapshot, DatabaseError> {
    match collection {
        Collection::Jobs => {
            let shipments = shipment_repo::list_all(db)?
                .iter()
                .map(Shipment::from_row)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Snapshot::Jobs(shipments))
        }
        Collection::Roles => {
            let employees = role_repo::list_all(db)?
                .iter()
                .map(Employee::from_row)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Snapshot::Roles(employees))
        }
    }
}

/// Broadcasts change events to subscribers.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: Arc<broadcast::Sender<ChangeEvent>>,
}

impl ChangeFeed {
    /// Creates a new feed with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a change event to all subscribers.
    pub fn publish(&self, event: ChangeEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Raw event receiver, for callers that want events rather than snapshots.
    pub fn events(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Subscribes to snapshots of `collection`.
    ///
    /// `on_snapshot` runs on a background task: once immediately, then after
    /// every change to the collection. Must be called inside a tokio runtime.
    /// Dropping the returned handle (or calling `unsubscribe`) stops delivery.
    pub fn subscribe<F>(
        &self,
        db: Database,
        collection: Collection,
        mut on_snapshot: F,
    ) -> SubscriptionHandle
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        // Subscribe before the initial load so no change slips in between.
        let mut rx = self.sender.subscribe();

        let task = tokio::spawn(async move {
            deliver(&db, collection, &mut on_snapshot);

            loop {
                match rx.recv().await {
                    Ok(event) if event.collection == collection => {
                        deliver(&db, collection, &mut on_snapshot);
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!(
                            "Subscriber for {:?} lagged by {} events, resending snapshot",
                            collection,
                            skipped
                        );
                        deliver(&db, collection, &mut on_snapshot);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        SubscriptionHandle { task: Some(task) }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(100)
    }
}

fn deliver<F>(db: &Database, collection: Collection, on_snapshot: &mut F)
where
    F: FnMut(Snapshot),
{
    match load_snapshot(db, collection) {
        Ok(snapshot) => on_snapshot(snapshot),
        Err(e) => log::error!("Failed to load {:?} snapshot: {}", collection, e),
    }
}

/// Cancels a subscription when unsubscribed or dropped.
pub struct SubscriptionHandle {
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Stops snapshot delivery.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    /// Whether the delivery task is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
