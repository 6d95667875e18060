//! Ordering and paging for list operations.
//!
//! A `page_size` of zero returns every matching record. Store adapters apply
//! a [`Pagination`] to an already filtered set with [`Pagination::apply`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{GraphError, GraphResult};

/// Fields every listable record exposes for ordering
pub trait Listable {
    /// Id rendered as a string
    fn list_id(&self) -> String;
    /// Record name
    fn list_name(&self) -> &str;
    /// Creation timestamp
    fn created_at(&self) -> DateTime<Utc>;
    /// Last update timestamp
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Field a list is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    /// Record id
    Id,
    /// Record name
    Name,
    /// Creation time
    #[default]
    CreatedAt,
    /// Last update time
    UpdatedAt,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first
    Asc,
    /// Largest first
    #[default]
    Desc,
}

/// Page request for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// One-based page number
    #[serde(default = "default_page_no")]
    pub page_no: u32,

    /// Records per page, zero disables paging
    #[serde(default)]
    pub page_size: u32,

    /// Ordering field
    #[serde(default)]
    pub order_by: OrderBy,

    /// Ordering direction
    #[serde(default)]
    pub order: SortOrder,
}

fn default_page_no() -> u32 {
    1
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_no: default_page_no(),
            page_size: 0,
            order_by: OrderBy::default(),
            order: SortOrder::default(),
        }
    }
}

impl Pagination {
    /// Every record, oldest first
    pub fn unpaged() -> Self {
        Self {
            order: SortOrder::Asc,
            ..Self::default()
        }
    }

    /// One page of `page_size` records
    pub fn page(page_no: u32, page_size: u32) -> Self {
        Self {
            page_no,
            page_size,
            ..Self::default()
        }
    }

    /// Set the ordering
    pub fn ordered_by(mut self, order_by: OrderBy, order: SortOrder) -> Self {
        self.order_by = order_by;
        self.order = order;
        self
    }

    /// Reject page numbers below one
    pub fn validate(&self) -> GraphResult<()> {
        if self.page_no == 0 {
            return Err(GraphError::InvalidInput(
                "page_no must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn compare<T: Listable>(&self, a: &T, b: &T) -> Ordering {
        let ordering = match self.order_by {
            OrderBy::Id => a.list_id().cmp(&b.list_id()),
            OrderBy::Name => a.list_name().cmp(b.list_name()),
            OrderBy::CreatedAt => a.created_at().cmp(&b.created_at()),
            OrderBy::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Order `items` and cut out the requested page.
    ///
    /// Returns the page and the total number of items before paging. The sort
    /// is stable, so records with equal keys keep their incoming order.
    pub fn apply<T: Listable>(&self, mut items: Vec<T>) -> GraphResult<(Vec<T>, u64)> {
        self.validate()?;
        let total = items.len() as u64;
        items.sort_by(|a, b| self.compare(a, b));

        if self.page_size == 0 {
            return Ok((items, total));
        }

        let offset = (self.page_no as usize - 1).saturating_mul(self.page_size as usize);
        let page = items
            .into_iter()
            .skip(offset)
            .take(self.page_size as usize)
            .collect();
        Ok((page, total))
    }
}
