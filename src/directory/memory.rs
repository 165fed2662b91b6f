//! In-memory district directory.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::info;

use super::{DirectoryError, DistrictFilter, DistrictLookup};
use crate::models::{District, DistrictId};

/// Directory backed by a plain vec of rows, scanned linearly.
///
/// The national directory is a few hundred rows, so a scan per query is
/// fine. Loads from the CSV seed shipped with the importer and doubles as
/// the test fixture.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    districts: Vec<District>,
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    id: String,
    name: String,
    province: String,
    is_active: bool,
}

impl MemoryDirectory {
    pub fn new(districts: Vec<District>) -> Self {
        Self { districts }
    }

    /// Load the directory from a CSV seed file.
    ///
    /// Expected columns: `id,name,province,is_active`.
    pub fn load_from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading district directory from {}", path.display());

        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("Failed to open district seed: {}", path.display()))?;

        let mut districts = Vec::new();
        for result in csv_reader.deserialize() {
            let row: SeedRow = result.context("Failed to parse district seed row")?;
            districts.push(District {
                id: DistrictId::new(row.id),
                name: row.name,
                province: row.province,
                is_active: row.is_active,
            });
        }

        info!("Loaded {} district rows", districts.len());
        Ok(Self { districts })
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}

#[async_trait]
impl DistrictLookup for MemoryDirectory {
    async fn find_active(
        &self,
        filter: &DistrictFilter,
        limit: usize,
    ) -> Result<Vec<District>, DirectoryError> {
        Ok(self
            .districts
            .iter()
            .filter(|d| d.is_active && filter.matches(d))
            .take(limit)
            .cloned()
            .collect())
    }
}
