//! Read-only access to the canonical district directory.
//!
//! The resolver only ever reads the directory through the [`DistrictLookup`]
//! capability, so tests run against an in-memory fixture while production
//! points at the application's Elasticsearch index.

mod es;
mod memory;

pub use es::EsDirectory;
pub use memory::MemoryDirectory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::District;

/// Substring containment filter over district rows.
///
/// A row matches when any `name_contains` entry is a substring of its name,
/// or any `province_contains` entry is a substring of its province.
/// Containment is case-insensitive, matching the collation of the
/// application database the directory was lifted from; callers may still
/// supply several case variants of the same term and backends OR them
/// together.
#[derive(Debug, Clone, Default)]
pub struct DistrictFilter {
    pub name_contains: Vec<String>,
    pub province_contains: Vec<String>,
}

impl DistrictFilter {
    /// Probe both name and province with the same variants.
    pub fn name_or_province(variants: Vec<String>) -> Self {
        Self {
            name_contains: variants.clone(),
            province_contains: variants,
        }
    }

    /// Probe the province field only.
    pub fn province_only(variants: Vec<String>) -> Self {
        Self {
            name_contains: Vec::new(),
            province_contains: variants,
        }
    }

    /// Whether `district` satisfies this filter.
    pub fn matches(&self, district: &District) -> bool {
        let name = district.name.to_lowercase();
        let province = district.province.to_lowercase();

        self.name_contains
            .iter()
            .any(|term| name.contains(&term.to_lowercase()))
            || self
                .province_contains
                .iter()
                .any(|term| province.contains(&term.to_lowercase()))
    }
}

/// Failure talking to the directory backend.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory query failed: {0}")]
    Query(String),

    #[error("Directory returned malformed data: {0}")]
    Malformed(String),
}

/// Read-only lookup into the canonical district directory.
#[async_trait]
pub trait DistrictLookup: Send + Sync {
    /// Return at most `limit` active districts matching `filter`.
    ///
    /// Inactive rows never match. Result order is backend order; callers
    /// that care about ranking impose their own.
    async fn find_active(
        &self,
        filter: &DistrictFilter,
        limit: usize,
    ) -> Result<Vec<District>, DirectoryError>;
}
