//! Crawled listing records handled by the import pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DistrictId, LocationQuery};

/// One crawled listing record as read from an import file.
///
/// Only the location hints are interpreted; every other crawler field
/// passes through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Passthrough fields from the crawler.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListingRecord {
    /// Location hints for the resolver.
    pub fn location_query(&self) -> LocationQuery {
        LocationQuery {
            location: self.location.clone(),
            province: self.province.clone(),
            address: self.address.clone(),
        }
    }
}

/// Listing record enriched with resolved district assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedListing {
    #[serde(flatten)]
    pub record: ListingRecord,

    /// Matched district ids, insertion order, deduplicated.
    pub district_ids: Vec<DistrictId>,

    /// Import timestamp for refresh tracking.
    pub import_timestamp: DateTime<Utc>,
}
