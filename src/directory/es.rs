//! Elasticsearch-backed district directory.

use async_trait::async_trait;
use elasticsearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    Elasticsearch, SearchParts,
};
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{DirectoryError, DistrictFilter, DistrictLookup};
use crate::models::District;

/// District directory served from an Elasticsearch index.
///
/// Documents are expected to carry `id`, `name`, `province` and `is_active`
/// with `name.keyword` / `province.keyword` subfields (the default dynamic
/// mapping). The index itself belongs to the surrounding application; this
/// client only reads it.
#[derive(Clone)]
pub struct EsDirectory {
    client: Elasticsearch,
    pub index_name: String,
}

impl EsDirectory {
    /// Create a new directory client.
    pub async fn new(es_url: &str, index_name: &str) -> anyhow::Result<Self> {
        let url = Url::parse(es_url)?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool).disable_proxy().build()?;

        let client = Elasticsearch::new(transport);

        Ok(Self {
            client,
            index_name: index_name.to_string(),
        })
    }

    /// Check if cluster is healthy
    pub async fn health_check(&self) -> anyhow::Result<bool> {
        let response = self
            .client
            .cluster()
            .health(elasticsearch::cluster::ClusterHealthParts::None)
            .send()
            .await?;

        Ok(response.status_code().is_success())
    }

    /// Get document count in index
    pub async fn doc_count(&self) -> anyhow::Result<u64> {
        let response = self
            .client
            .count(elasticsearch::CountParts::Index(&[&self.index_name]))
            .send()
            .await?;

        let body = response.json::<serde_json::Value>().await?;
        Ok(body["count"].as_u64().unwrap_or(0))
    }

    /// Build the bool query for a containment filter.
    ///
    /// Each variant becomes a `should` wildcard clause; `is_active` is a
    /// hard filter. Wildcards run case-insensitive, matching the collation
    /// the directory inherited from the application database.
    fn build_query(filter: &DistrictFilter, limit: usize) -> serde_json::Value {
        let mut should_clauses = Vec::new();

        for variant in &filter.name_contains {
            should_clauses.push(json!({
                "wildcard": {
                    "name.keyword": {
                        "value": format!("*{}*", variant),
                        "case_insensitive": true
                    }
                }
            }));
        }
        for variant in &filter.province_contains {
            should_clauses.push(json!({
                "wildcard": {
                    "province.keyword": {
                        "value": format!("*{}*", variant),
                        "case_insensitive": true
                    }
                }
            }));
        }

        json!({
            "query": {
                "bool": {
                    "should": should_clauses,
                    "minimum_should_match": 1,
                    "filter": [{ "term": { "is_active": true } }]
                }
            },
            "size": limit
        })
    }
}

#[async_trait]
impl DistrictLookup for EsDirectory {
    async fn find_active(
        &self,
        filter: &DistrictFilter,
        limit: usize,
    ) -> Result<Vec<District>, DirectoryError> {
        let body = Self::build_query(filter, limit);
        debug!("District query: {}", body);

        let response = self
            .client
            .search(SearchParts::Index(&[&self.index_name]))
            .body(body)
            .send()
            .await
            .map_err(|e| DirectoryError::Query(e.to_string()))?;

        let response_body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| DirectoryError::Query(e.to_string()))?;

        let hits = response_body["hits"]["hits"]
            .as_array()
            .map(|a| a.to_vec())
            .unwrap_or_default();

        hits.into_iter()
            .map(|hit| {
                serde_json::from_value(hit["_source"].clone())
                    .map_err(|e| DirectoryError::Malformed(e.to_string()))
            })
            .collect()
    }
}
