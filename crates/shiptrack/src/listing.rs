//! Dashboard listing: partition, search, sort and paginate shipments.
//!
//! The free functions are pure. [`ListView`] holds the view state of one
//! dashboard and applies the page-reset and clamping rules.

use serde::{Deserialize, Serialize};

use crate::config::ListingConfig;
use crate::error::ValidationError;
use crate::shipment::Shipment;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    #[default]
    All,
    /// Everything not completed, delayed shipments included.
    Active,
    Completed,
}

impl Partition {
    pub fn includes(&self, shipment: &Shipment) -> bool {
        match self {
            Partition::All => true,
            Partition::Active => shipment.is_active(),
            Partition::Completed => !shipment.is_active(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    LastUpdatedDesc,
    LastUpdatedAsc,
    JobNumberAsc,
    JobNumberDesc,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    /// Never less than 1, even for an empty listing.
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

pub fn partition(shipments: Vec<Shipment>, which: Partition) -> Vec<Shipment> {
    shipments.into_iter().filter(|s| which.includes(s)).collect()
}

/// Keeps shipments whose job number contains `query`, ignoring case.
/// An empty or blank query keeps everything.
pub fn filter_by_job_number(shipments: Vec<Shipment>, query: &str) -> Vec<Shipment> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return shipments;
    }
    shipments
        .into_iter()
        .filter(|s| s.job_number.to_lowercase().contains(&needle))
        .collect()
}

/// Sorts in place. Ties on the timestamp are broken by job number.
pub fn sort_shipments(shipments: &mut [Shipment], order: SortOrder) {
    match order {
        SortOrder::LastUpdatedDesc => shipments.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.job_number.cmp(&b.job_number))
        }),
        SortOrder::LastUpdatedAsc => shipments.sort_by(|a, b| {
            a.last_updated
                .cmp(&b.last_updated)
                .then_with(|| a.job_number.cmp(&b.job_number))
        }),
        SortOrder::JobNumberAsc => shipments.sort_by(|a, b| a.job_number.cmp(&b.job_number)),
        SortOrder::JobNumberDesc => shipments.sort_by(|a, b| b.job_number.cmp(&a.job_number)),
    }
}

/// Slices out page `page` (1-based), clamped to the available range.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// Query parameters of a listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListQuery {
    #[serde(default)]
    pub partition: Partition,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

/// View state of a dashboard list.
///
/// Changing the search text, sort order, partition or page size returns to
/// page 1. Applying the view to a shorter list clamps the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    partition: Partition,
    search: String,
    sort: SortOrder,
    page: usize,
    page_size: usize,
    page_size_options: Vec<usize>,
}

impl ListView {
    pub fn new(config: &ListingConfig) -> Self {
        Self {
            partition: Partition::default(),
            search: String::new(),
            sort: SortOrder::default(),
            page: 1,
            page_size: config.default_page_size,
            page_size_options: config.page_size_options.clone(),
        }
    }

    /// Builds a view from request parameters.
    pub fn from_query(config: &ListingConfig, query: &ListQuery) -> Result<Self, ValidationError> {
        let mut view = Self::new(config);
        view.partition = query.partition;
        view.search = query.search.clone();
        view.sort = query.sort;
        if let Some(size) = query.page_size {
            view.set_page_size(size)?;
        }
        if let Some(page) = query.page {
            view.set_page(page);
        }
        Ok(view)
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.page_size_options
    }

    pub fn set_search(&mut self, search: &str) {
        if self.search != search {
            self.search = search.to_string();
            self.page = 1;
        }
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        if self.sort != sort {
            self.sort = sort;
            self.page = 1;
        }
    }

    pub fn set_partition(&mut self, partition: Partition) {
        if self.partition != partition {
            self.partition = partition;
            self.page = 1;
        }
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<(), ValidationError> {
        if !self.page_size_options.contains(&size) {
            return Err(ValidationError::PageSizeNotAllowed(size));
        }
        if self.page_size != size {
            self.page_size = size;
            self.page = 1;
        }
        Ok(())
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Moves forward one page. [`apply`](Self::apply) pulls it back to the
    /// last page if the listing is shorter.
    pub fn next_page(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Runs partition, search, sort and pagination over `shipments`.
    pub fn apply(&mut self, shipments: Vec<Shipment>) -> Page<Shipment> {
        let mut visible = filter_by_job_number(partition(shipments, self.partition), &self.search);
        sort_shipments(&mut visible, self.sort);

        let page = paginate(&visible, self.page, self.page_size);
        self.page = page.page;
        page
    }
}
