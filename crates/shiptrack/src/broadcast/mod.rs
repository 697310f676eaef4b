//! Live change notifications for the shipment and role collections.

pub mod change_feed;

pub use change_feed::{
    load_snapshot, ChangeEvent, ChangeFeed, ChangeKind, Collection, Snapshot, SubscriptionHandle,
};
