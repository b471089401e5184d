use serde::{Deserialize, Serialize};

use crate::domain::PremiseId;

/// Query string of `GET /appeals/v1.0/appeals/`.
///
/// The backend treats an empty `search` or `premise_id` as "no filter", so
/// both are always sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealListQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: String,
    pub premise_id: String,
}

impl AppealListQuery {
    pub fn new(page: u32, page_size: u32, search: &str, premise_id: Option<PremiseId>) -> Self {
        Self {
            page,
            page_size,
            search: search.to_string(),
            premise_id: premise_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiseListQuery {
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApartmentListQuery {
    pub premise_id: PremiseId,
}

/// Paginated list envelope with the server-side total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: u64,
}

/// List envelope without a total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results<T> {
    pub results: Vec<T>,
}
