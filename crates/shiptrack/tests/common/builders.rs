//! Builders for creating test data without repetitive boilerplate.

#![allow(dead_code)]

use chrono::NaiveDate;

use shiptrack::config::{Config, PoNumberMatching};
use shiptrack::StatusChange;

/// Builder for `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn strict_progression(mut self) -> Self {
        self.config.tracking.allow_status_regression = false;
        self
    }

    pub fn po_matching(mut self, mode: PoNumberMatching) -> Self {
        self.config.tracking.po_number_matching = mode;
        self
    }

    pub fn page_sizes(mut self, options: &[usize], default: usize) -> Self {
        self.config.listing.page_size_options = options.to_vec();
        self.config.listing.default_page_size = default;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Builder for a first status change that creates a shipment.
pub struct NewShipmentBuilder {
    change: StatusChange,
}

impl NewShipmentBuilder {
    pub fn new(job_number: &str) -> Self {
        Self {
            change: StatusChange::new(job_number, "Pending")
                .weight("1200 kg")
                .num_packages(3)
                .transit_point("Jebel Ali"),
        }
    }

    pub fn status(mut self, status: &str) -> Self {
        self.change.status = status.to_string();
        self
    }

    pub fn po_number(mut self, po_number: &str) -> Self {
        self.change = self.change.po_number(po_number);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.change = self.change.description(description);
        self
    }

    pub fn planning_date(mut self, y: i32, m: u32, d: u32) -> Self {
        let date = NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
        self.change = self.change.planning_date(date);
        self
    }

    pub fn build(self) -> StatusChange {
        self.change
    }
}
