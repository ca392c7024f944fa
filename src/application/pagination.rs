//! Shared page-number pagination helpers.
//!
//! Both the public feed and the admin dashboard page through posts with the
//! same arithmetic: a 1-based page number from the query string, a fixed
//! page size, newest first. Requesting a page past the end is not an error;
//! it yields an empty list.

use serde::Deserialize;

/// Default number of posts per page on public and admin listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Raw `?page=` query string, kept as text so that non-numeric values fall
/// back to page 1 instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn page_number(&self) -> u32 {
        parse_page_number(self.page.as_deref())
    }
}

/// Parse a page parameter: absent, non-numeric, or zero all mean page 1.
pub fn parse_page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .map(|page| page.max(1))
        .unwrap_or(1)
}

/// A resolved listing window: which rows to fetch and how the page bar
/// should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    /// Rows to skip before this page starts.
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    /// Rows to fetch for this page.
    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }

    /// Total pages needed for `total` records, rounding up.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.size))
    }
}
