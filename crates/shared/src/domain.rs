use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(AppealId);
id_newtype!(PremiseId);
id_newtype!(ApartmentId);

/// Status attached to an appeal by the backend. Only `name` is interpreted
/// client-side; everything else rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealStatus {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppealStatus {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// A service-request record as served by the appeals API.
///
/// The store only reads `number`, `created_at` and `status.name` (for
/// sorting). Unknown fields are preserved in `extra` so a record can be
/// handed back to the UI, or re-serialized, without losing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appeal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AppealId>,
    pub number: i64,
    pub created_at: String,
    pub status: AppealStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Appeal {
    pub fn new(number: i64, created_at: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: None,
            number,
            created_at: created_at.into(),
            status: AppealStatus::named(status),
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: AppealId) -> Self {
        self.id = Some(id);
        self
    }
}

/// A building the current user has access to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Premise {
    pub id: PremiseId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A unit within a premise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
    pub id: ApartmentId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Free-form request body for creating or patching an appeal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppealFields(pub Map<String, Value>);

impl AppealFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for AppealFields {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl TryFrom<Value> for AppealFields {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}
