//! Two-tier district resolution over the directory.
//!
//! Tier one probes the directory with terms extracted from the location
//! string (or the address as fallback source) plus the province hint.
//! Tier two, entered only when tier one matched nothing, retries on the
//! province field alone.

mod terms;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::directory::{DirectoryError, DistrictFilter, DistrictLookup};
use crate::models::{DistrictId, LocationQuery};

/// Per-query match cap for the primary pass. Bounds fan-out from generic
/// substrings like "Bình".
const PRIMARY_LIMIT: usize = 5;

/// Per-query match cap for the provincial fallback.
const FALLBACK_LIMIT: usize = 3;

/// Degraded resolution: the directory could not be queried.
///
/// Carries the raw location string for the import log. Callers that only
/// want ids take [`ResolutionWarning::district_ids`], the empty default.
#[derive(Error, Debug)]
#[error("District resolution degraded for location {location:?}: {source}")]
pub struct ResolutionWarning {
    pub location: Option<String>,
    #[source]
    pub source: DirectoryError,
}

impl ResolutionWarning {
    /// Empty-list default for callers that don't need the diagnostic.
    pub fn district_ids(&self) -> Vec<DistrictId> {
        Vec::new()
    }
}

/// Resolves free-text location hints to canonical district ids.
///
/// Holds no mutable state; one instance may serve any number of concurrent
/// callers against the same read-only directory.
pub struct Resolver {
    directory: Arc<dyn DistrictLookup>,
}

impl Resolver {
    pub fn new(directory: Arc<dyn DistrictLookup>) -> Self {
        Self { directory }
    }

    /// Resolve location hints to an ordered, deduplicated id list.
    ///
    /// Returns `Ok` with an empty vec when no usable input was given or
    /// nothing matched. A directory failure comes back as a
    /// [`ResolutionWarning`] rather than propagating, so a batch caller
    /// continues with its next record.
    pub async fn resolve(
        &self,
        query: &LocationQuery,
    ) -> Result<Vec<DistrictId>, ResolutionWarning> {
        self.resolve_inner(query)
            .await
            .map_err(|source| ResolutionWarning {
                location: query.location.clone(),
                source,
            })
    }

    /// Resolve, logging any warning and degrading to an empty list.
    pub async fn resolve_or_empty(&self, query: &LocationQuery) -> Vec<DistrictId> {
        match self.resolve(query).await {
            Ok(ids) => ids,
            Err(warning) => {
                warn!("{warning}");
                warning.district_ids()
            }
        }
    }

    async fn resolve_inner(
        &self,
        query: &LocationQuery,
    ) -> Result<Vec<DistrictId>, DirectoryError> {
        let search_terms = terms::search_terms(query);
        if search_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<DistrictId> = Vec::new();

        // Primary pass: each term probes name and province.
        for term in &search_terms {
            let filter = DistrictFilter::name_or_province(terms::case_variants(term));
            let matched = self.directory.find_active(&filter, PRIMARY_LIMIT).await?;
            debug!("Term {:?} matched {} districts", term, matched.len());

            for district in matched {
                if !ids.contains(&district.id) {
                    ids.push(district.id);
                }
            }
        }

        // Provincial fallback, only when the primary pass came up empty.
        if ids.is_empty() {
            if let Some(province) = query
                .province
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
            {
                let filter = DistrictFilter::province_only(terms::case_variants(province));
                let matched = self.directory.find_active(&filter, FALLBACK_LIMIT).await?;
                debug!(
                    "Provincial fallback {:?} matched {} districts",
                    province,
                    matched.len()
                );

                for district in matched {
                    if !ids.contains(&district.id) {
                        ids.push(district.id);
                    }
                }
            }
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::models::District;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn district(id: &str, name: &str, province: &str, is_active: bool) -> District {
        District {
            id: DistrictId::new(id),
            name: name.to_string(),
            province: province.to_string(),
            is_active,
        }
    }

    fn fixture_rows() -> Vec<District> {
        vec![
            district("d1", "Bình Tân", "Hồ Chí Minh", true),
            district("d2", "Quận 1", "Hồ Chí Minh", true),
            district("d3", "Bình Thạnh", "Hồ Chí Minh", true),
            district("d4", "Đống Đa", "Hà Nội", true),
            district("d5", "Hoàn Kiếm", "Hà Nội", false),
        ]
    }

    fn resolver(rows: Vec<District>) -> Resolver {
        Resolver::new(Arc::new(MemoryDirectory::new(rows)))
    }

    /// Directory wrapper that counts queries, for fallback-gating checks.
    struct CountingDirectory {
        inner: MemoryDirectory,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DistrictLookup for CountingDirectory {
        async fn find_active(
            &self,
            filter: &DistrictFilter,
            limit: usize,
        ) -> Result<Vec<District>, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_active(filter, limit).await
        }
    }

    /// Spy that records each query's shape and limit, and answers only
    /// province-only queries. Lets the fallback tier produce results the
    /// primary tier did not.
    struct ShapeSpyDirectory {
        inner: MemoryDirectory,
        seen: std::sync::Mutex<Vec<(bool, usize)>>,
    }

    #[async_trait]
    impl DistrictLookup for ShapeSpyDirectory {
        async fn find_active(
            &self,
            filter: &DistrictFilter,
            limit: usize,
        ) -> Result<Vec<District>, DirectoryError> {
            let province_only = filter.name_contains.is_empty();
            self.seen.lock().unwrap().push((province_only, limit));
            if province_only {
                self.inner.find_active(filter, limit).await
            } else {
                Ok(Vec::new())
            }
        }
    }

    /// Directory that always fails, simulating a connectivity fault.
    struct FailingDirectory;

    #[async_trait]
    impl DistrictLookup for FailingDirectory {
        async fn find_active(
            &self,
            _filter: &DistrictFilter,
            _limit: usize,
        ) -> Result<Vec<District>, DirectoryError> {
            Err(DirectoryError::Query("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_all_empty_inputs_resolve_to_nothing() {
        let resolver = resolver(fixture_rows());
        let ids = resolver.resolve(&LocationQuery::default()).await.unwrap();
        assert!(ids.is_empty());

        let blank = LocationQuery {
            location: Some("  ".to_string()),
            province: Some("".to_string()),
            address: Some(" ".to_string()),
        };
        assert!(resolver.resolve(&blank).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_last_segment_is_the_district() {
        let resolver = resolver(fixture_rows());
        let query = LocationQuery {
            location: Some("Sài Gòn/Bình Tân".to_string()),
            ..Default::default()
        };
        let ids = resolver.resolve(&query).await.unwrap();
        assert_eq!(ids, vec![DistrictId::new("d1")]);
    }

    #[tokio::test]
    async fn test_crawled_casing_still_matches() {
        let resolver = resolver(fixture_rows());
        for location in ["BÌNH TÂN", "bình tân"] {
            let query = LocationQuery {
                location: Some(location.to_string()),
                ..Default::default()
            };
            let ids = resolver.resolve(&query).await.unwrap();
            assert_eq!(ids, vec![DistrictId::new("d1")], "location {:?}", location);
        }
    }

    #[tokio::test]
    async fn test_duplicate_matches_kept_once_at_first_position() {
        // "Bình Tân" matches d1 by name; the province term matches d1, d2
        // and d3 by province. d1 must stay at its first-match position.
        let resolver = resolver(fixture_rows());
        let query = LocationQuery {
            location: Some("Bình Tân".to_string()),
            province: Some("Hồ Chí Minh".to_string()),
            ..Default::default()
        };
        let ids = resolver.resolve(&query).await.unwrap();
        assert_eq!(ids[0], DistrictId::new("d1"));
        assert_eq!(
            ids.iter().filter(|id| **id == DistrictId::new("d1")).count(),
            1
        );
        assert!(ids.contains(&DistrictId::new("d2")));
        assert!(ids.contains(&DistrictId::new("d3")));
    }

    #[tokio::test]
    async fn test_inactive_districts_never_returned() {
        let resolver = resolver(fixture_rows());
        let query = LocationQuery {
            location: Some("Hoàn Kiếm".to_string()),
            ..Default::default()
        };
        assert!(resolver.resolve(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_skipped_when_primary_matches() {
        let directory = Arc::new(CountingDirectory {
            inner: MemoryDirectory::new(fixture_rows()),
            calls: AtomicUsize::new(0),
        });
        let resolver = Resolver::new(directory.clone());

        let query = LocationQuery {
            location: Some("Bình Tân".to_string()),
            province: Some("Hồ Chí Minh".to_string()),
            ..Default::default()
        };
        let ids = resolver.resolve(&query).await.unwrap();
        assert!(!ids.is_empty());
        // one query per term, no fallback query
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fallback_fires_on_empty_primary() {
        let directory = Arc::new(CountingDirectory {
            inner: MemoryDirectory::new(fixture_rows()),
            calls: AtomicUsize::new(0),
        });
        let resolver = Resolver::new(directory.clone());

        // Neither the token nor the province hint matches anything, so
        // both primary queries run and the fallback query runs after them.
        let query = LocationQuery {
            location: Some("Khu phố 9".to_string()),
            province: Some("Bắc Ninh".to_string()),
            ..Default::default()
        };
        let ids = resolver.resolve(&query).await.unwrap();
        assert!(ids.is_empty());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_primary_term_capped_at_five() {
        let mut rows = Vec::new();
        for n in 0..20 {
            rows.push(district(
                &format!("g{}", n),
                &format!("Giồng {}", n),
                "Tiền Giang",
                true,
            ));
        }
        let resolver = resolver(rows);

        // 20 name matches, capped at 5
        let query = LocationQuery {
            location: Some("Giồng".to_string()),
            ..Default::default()
        };
        assert_eq!(resolver.resolve(&query).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_fallback_capped_at_three() {
        let mut rows = Vec::new();
        for n in 0..20 {
            rows.push(district(
                &format!("g{}", n),
                &format!("Khu {}", n),
                "Đồng Nai",
                true,
            ));
        }
        let directory = Arc::new(ShapeSpyDirectory {
            inner: MemoryDirectory::new(rows),
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let resolver = Resolver::new(directory.clone());

        let query = LocationQuery {
            location: Some("Thôn 3".to_string()),
            province: Some("Đồng Nai".to_string()),
            ..Default::default()
        };
        let ids = resolver.resolve(&query).await.unwrap();
        assert_eq!(ids.len(), 3);

        // two primary queries at limit 5, then the fallback at limit 3
        let seen = directory.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(false, 5), (false, 5), (true, 3)]);
    }

    #[tokio::test]
    async fn test_directory_failure_degrades_to_warning() {
        let resolver = Resolver::new(Arc::new(FailingDirectory));
        let query = LocationQuery {
            location: Some("Sài Gòn/Bình Tân".to_string()),
            ..Default::default()
        };

        let warning = resolver.resolve(&query).await.unwrap_err();
        assert_eq!(warning.location.as_deref(), Some("Sài Gòn/Bình Tân"));
        assert!(warning.district_ids().is_empty());

        // the lenient form keeps a batch caller going
        assert!(resolver.resolve_or_empty(&query).await.is_empty());
        assert!(resolver.resolve_or_empty(&query).await.is_empty());
    }

    #[tokio::test]
    async fn test_blank_location_resolves_via_address() {
        let resolver = resolver(fixture_rows());
        let query = LocationQuery {
            location: Some("".to_string()),
            province: None,
            address: Some("12 Nguyễn Huệ, Quận 1, TP.HCM".to_string()),
        };
        let ids = resolver.resolve(&query).await.unwrap();
        assert_eq!(ids, vec![DistrictId::new("d2")]);
    }
}
