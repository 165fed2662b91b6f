//! District directory rows and resolution inputs.

use serde::{Deserialize, Serialize};

/// Opaque identifier of a canonical district row.
///
/// Minted by the surrounding application; this crate never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistrictId(pub String);

impl DistrictId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DistrictId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical district row from the reference directory.
///
/// Read-only here; creation and deactivation belong to the surrounding
/// application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct District {
    pub id: DistrictId,

    /// Canonical district name, may contain diacritics.
    pub name: String,

    /// Province the district is grouped under.
    pub province: String,

    /// Inactive rows are never returned by lookups.
    pub is_active: bool,
}

/// Raw location hints carried by one crawled record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationQuery {
    /// Informal "<Province>/<District>" or comma-separated, not guaranteed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Province hint, independent of `location`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,

    /// Street address, consulted only when `location` yields no token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}
