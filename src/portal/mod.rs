//! Portal domain: items, reports, claims and the accounts that act on them.
//!
//! Operations take the acting user explicitly and return `ServerError` values
//! that the HTTP layer maps straight onto status codes.

pub mod access;
pub mod claims;
pub mod items;
pub mod lifecycle;
pub mod lookups;
pub mod reports;
pub mod users;
pub mod views;

pub use views::{
    CategoryView, ClaimView, ImageView, ItemView, LocationView, PendingClaimRow, ReportView,
    StudentReportRow, UserView,
};

/// Largest page a list operation returns
const MAX_PAGE_LIMIT: u64 = 1000;

const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Offset pagination shared by every list operation.
///
/// Both values are bounded so they always bind as signed 64-bit SQL integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    skip: u64,
    limit: u64,
}

impl Page {
    pub fn new(skip: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            skip: skip.unwrap_or(0).min(i64::MAX as u64),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
