//! Appeals view state: the data the UI renders, its pure projections and the
//! transitions that replace it.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{Apartment, Appeal, Premise, PremiseId};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    /// Server-reported total; only ever written from a list response.
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }
}

/// Partial pagination. `None` fields keep their current value on merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationUpdate {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub total: Option<u64>,
}

impl PaginationUpdate {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn total(total: u64) -> Self {
        Self {
            total: Some(total),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub search: String,
    pub premise_id: Option<PremiseId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum SortBy {
    #[default]
    Number,
    CreatedAt,
    Status,
    /// Any key the store does not know how to order by. Sorting by it leaves
    /// the list as-is.
    Other(String),
}

impl SortBy {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Number => "number",
            Self::CreatedAt => "created_at",
            Self::Status => "status",
            Self::Other(key) => key,
        }
    }
}

impl FromStr for SortBy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "number" => Self::Number,
            "created_at" => Self::CreatedAt,
            "status" => Self::Status,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort order '{0}', expected asc or desc")]
pub struct ParseSortOrderError(String);

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(ParseSortOrderError(s.to_string()))
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppealsState {
    appeals: Vec<Appeal>,
    premises: Vec<Premise>,
    apartments: Vec<Apartment>,
    appeal_details: Option<Appeal>,
    pagination: Pagination,
    filters: Filters,
    is_loading: bool,
    sort_by: SortBy,
    sort_order: SortOrder,
}

impl AppealsState {
    pub fn with_page_size(page_size: u32) -> Self {
        let mut state = Self::default();
        state.pagination.page_size = page_size;
        state
    }

    pub fn appeals(&self) -> &[Appeal] {
        &self.appeals
    }

    pub fn premises(&self) -> &[Premise] {
        &self.premises
    }

    pub fn apartments(&self) -> &[Apartment] {
        &self.apartments
    }

    pub fn appeal_details(&self) -> Option<&Appeal> {
        self.appeal_details.as_ref()
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn sort_by(&self) -> &SortBy {
        &self.sort_by
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Copy of `appeals` ordered by the current sort key and direction.
    ///
    /// The sort is stable: appeals that compare equal keep their relative
    /// order in both directions.
    pub fn sorted_appeals(&self) -> Vec<Appeal> {
        let mut sorted = self.appeals.clone();
        sorted.sort_by(|a, b| {
            let ordering = compare_appeals(&self.sort_by, a, b);
            match self.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        sorted
    }

    pub fn set_appeals(&mut self, appeals: Vec<Appeal>) {
        self.appeals = appeals;
    }

    pub fn set_premises(&mut self, premises: Vec<Premise>) {
        self.premises = premises;
    }

    pub fn set_apartments(&mut self, apartments: Vec<Apartment>) {
        self.apartments = apartments;
    }

    pub fn set_appeal_details(&mut self, appeal_details: Option<Appeal>) {
        self.appeal_details = appeal_details;
    }

    pub fn set_filters(&mut self, filters: &Filters) {
        self.filters = filters.clone();
    }

    pub fn set_pagination(&mut self, update: PaginationUpdate) {
        if let Some(page) = update.page {
            self.pagination.page = page;
        }
        if let Some(page_size) = update.page_size {
            self.pagination.page_size = page_size;
        }
        if let Some(total) = update.total {
            self.pagination.total = total;
        }
    }

    pub fn set_loading(&mut self, is_loading: bool) {
        self.is_loading = is_loading;
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.sort_by = sort_by;
    }

    pub fn set_sort_order(&mut self, sort_order: SortOrder) {
        self.sort_order = sort_order;
    }
}

/// Ascending comparator for `sort_by`. Total for every key so the standard
/// sort never sees an inconsistent order.
pub fn compare_appeals(sort_by: &SortBy, a: &Appeal, b: &Appeal) -> Ordering {
    match sort_by {
        SortBy::Number => a.number.cmp(&b.number),
        SortBy::CreatedAt => parse_timestamp(&a.created_at).cmp(&parse_timestamp(&b.created_at)),
        SortBy::Status => collation_key(&a.status.name).cmp(&collation_key(&b.status.name)),
        SortBy::Other(_) => Ordering::Equal,
    }
}

/// Parses the timestamp formats the backend emits. Naive values are taken as
/// UTC. `None` (unparsable) orders before every valid timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

// Primary level ignores case and treats ё as е. Ties go to lowercase before
// uppercase, then е before ё, then the raw string.
fn collation_key(name: &str) -> (String, Vec<(bool, char)>, &str) {
    let primary = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ё' { 'е' } else { c })
        .collect();
    let tertiary = name
        .chars()
        .map(|c| (c.is_uppercase(), c.to_lowercase().next().unwrap_or(c)))
        .collect();
    (primary, tertiary, name)
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
