//! Shipment status progression.
//!
//! A shipment moves through six ordered stages. `Delayed` is a legal status
//! that sits outside the ordering: while a shipment is delayed, no stage of
//! the progress bar is complete or current, and a separate delayed banner is
//! shown instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Every value the `status` field of a shipment may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Initiated")]
    Initiated,
    #[serde(rename = "Port of Loading")]
    PortOfLoading,
    #[serde(rename = "Port of Discharge")]
    PortOfDischarge,
    #[serde(rename = "In Transit")]
    InTransit,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Delayed")]
    Delayed,
}

/// The ordered stages; index is progress order.
pub const STAGES: [Status; 6] = [
    Status::Pending,
    Status::Initiated,
    Status::PortOfLoading,
    Status::PortOfDischarge,
    Status::InTransit,
    Status::Completed,
];

/// All recognized status values, in the order the update form lists them.
pub const ALL_STATUSES: [Status; 7] = [
    Status::Pending,
    Status::Initiated,
    Status::PortOfLoading,
    Status::PortOfDischarge,
    Status::InTransit,
    Status::Delayed,
    Status::Completed,
];

impl Status {
    /// Display name, which is also the stored value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Initiated => "Initiated",
            Status::PortOfLoading => "Port of Loading",
            Status::PortOfDischarge => "Port of Discharge",
            Status::InTransit => "In Transit",
            Status::Completed => "Completed",
            Status::Delayed => "Delayed",
        }
    }

    /// Position in the stage order, `None` for `Delayed`.
    pub fn order_index(&self) -> Option<usize> {
        STAGES.iter().position(|s| s == self)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Status::Completed)
    }

    pub fn is_delayed(&self) -> bool {
        matches!(self, Status::Delayed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    /// Exact, case-sensitive match against the stored names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

/// How one stage of the progress bar renders relative to the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Complete,
    Current,
    Future,
}

impl StageState {
    /// Class of the stage marker dot.
    pub fn dot_class(&self) -> &'static str {
        match self {
            StageState::Complete => "bg-green-400",
            StageState::Current => "bg-blue-400",
            StageState::Future => "bg-gray-300",
        }
    }

    /// Class of the stage label.
    pub fn label_class(&self) -> &'static str {
        match self {
            StageState::Complete => "text-green-500",
            StageState::Current => "text-blue-500 font-bold",
            StageState::Future => "text-gray-500",
        }
    }
}

const DELAYED_BADGE_CLASS: &str = "bg-red-400";

/// Index of a raw status string in the stage order.
///
/// Anything that is not an ordered stage, including `Delayed` and strings
/// that are not statuses at all, yields `None`.
pub fn order_index_of(raw: &str) -> Option<usize> {
    raw.parse::<Status>().ok().and_then(|s| s.order_index())
}

/// Visual state of `stage` given the shipment's current status.
pub fn stage_visual_state(stage: Status, current: &str) -> StageState {
    let (Some(i), Some(c)) = (stage.order_index(), order_index_of(current)) else {
        return StageState::Future;
    };

    match i.cmp(&c) {
        std::cmp::Ordering::Less => StageState::Complete,
        std::cmp::Ordering::Equal => StageState::Current,
        std::cmp::Ordering::Greater => StageState::Future,
    }
}

/// One rendered stage of the progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub stage: Status,
    pub state: StageState,
    pub dot_class: &'static str,
    pub label_class: &'static str,
    /// Whether the connector leading to the next stage is filled.
    pub connector_filled: bool,
}

/// Everything the tracking page needs to draw a shipment's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub status: String,
    pub badge_class: &'static str,
    pub delayed: bool,
    pub stages: Vec<StageView>,
}

impl Progress {
    /// Renders progress for a raw status value. Unknown values render like
    /// `Delayed` without the banner.
    pub fn for_status(raw: &str) -> Self {
        let current = order_index_of(raw);
        let delayed = raw == Status::Delayed.as_str();

        let stages = STAGES
            .iter()
            .enumerate()
            .map(|(index, stage)| {
                let state = stage_visual_state(*stage, raw);
                StageView {
                    stage: *stage,
                    state,
                    dot_class: state.dot_class(),
                    label_class: state.label_class(),
                    connector_filled: index + 1 < STAGES.len()
                        && current.is_some_and(|c| c > index),
                }
            })
            .collect();

        let badge_class = if delayed {
            DELAYED_BADGE_CLASS
        } else {
            match raw.parse::<Status>() {
                Ok(status) => stage_visual_state(status, raw).dot_class(),
                Err(_) => StageState::Future.dot_class(),
            }
        };

        Self {
            status: raw.to_string(),
            badge_class,
            delayed,
            stages,
        }
    }

    /// The stage marked current, if any.
    pub fn current_stage(&self) -> Option<Status> {
        self.stages
            .iter()
            .find(|s| s.state == StageState::Current)
            .map(|s| s.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for status in ALL_STATUSES {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("pending".parse::<Status>().is_err());
        assert!("In transit".parse::<Status>().is_err());
        assert!(matches!(
            "Shipped".parse::<Status>(),
            Err(ValidationError::UnknownStatus(s)) if s == "Shipped"
        ));
    }

    #[test]
    fn test_order_index() {
        assert_eq!(Status::Pending.order_index(), Some(0));
        assert_eq!(Status::PortOfDischarge.order_index(), Some(3));
        assert_eq!(Status::Completed.order_index(), Some(5));
        assert_eq!(Status::Delayed.order_index(), None);
    }

    #[test]
    fn test_visual_state_matches_index_comparison() {
        for current in STAGES {
            let mut current_count = 0;
            for stage in STAGES {
                let state = stage_visual_state(stage, current.as_str());
                let (i, c) = (stage.order_index().unwrap(), current.order_index().unwrap());
                let expected = if i < c {
                    StageState::Complete
                } else if i == c {
                    StageState::Current
                } else {
                    StageState::Future
                };
                assert_eq!(state, expected, "stage {stage} under {current}");
                if state == StageState::Current {
                    current_count += 1;
                }
            }
            assert_eq!(current_count, 1);
        }
    }

    #[test]
    fn test_delayed_and_unknown_render_all_future() {
        for raw in ["Delayed", "Not Found", "", "completed"] {
            for stage in STAGES {
                assert_eq!(stage_visual_state(stage, raw), StageState::Future);
            }
        }
    }

    #[test]
    fn test_progress_delayed_banner_only_for_delayed() {
        let delayed = Progress::for_status("Delayed");
        assert!(delayed.delayed);
        assert_eq!(delayed.badge_class, "bg-red-400");
        assert_eq!(delayed.current_stage(), None);
        assert!(delayed.stages.iter().all(|s| !s.connector_filled));

        let unknown = Progress::for_status("Lost");
        assert!(!unknown.delayed);
        assert_eq!(unknown.badge_class, "bg-gray-300");
        assert!(unknown.stages.iter().all(|s| s.state == StageState::Future));
    }

    #[test]
    fn test_progress_in_transit() {
        let progress = Progress::for_status("In Transit");
        assert_eq!(progress.current_stage(), Some(Status::InTransit));
        assert_eq!(progress.badge_class, "bg-blue-400");

        let filled: Vec<bool> = progress.stages.iter().map(|s| s.connector_filled).collect();
        assert_eq!(filled, vec![true, true, true, true, false, false]);
        assert_eq!(progress.stages[0].label_class, "text-green-500");
        assert_eq!(progress.stages[4].label_class, "text-blue-500 font-bold");
        assert_eq!(progress.stages[5].dot_class, "bg-gray-300");
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&Status::PortOfLoading).unwrap();
        assert_eq!(json, "\"Port of Loading\"");
        let back: Status = serde_json::from_str("\"In Transit\"").unwrap();
        assert_eq!(back, Status::InTransit);
    }
}
