//! Resolution query server.
//!
//! Provides an HTTP API for ad-hoc district resolution against the live
//! directory, mostly used to sanity-check crawled location strings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use banyan::directory::{DistrictLookup, EsDirectory, MemoryDirectory};
use banyan::models::{DistrictId, LocationQuery};
use banyan::resolver::Resolver;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "District resolution query server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// District directory CSV seed (serves from memory instead of Elasticsearch)
    #[arg(long)]
    districts_csv: Option<PathBuf>,

    /// Elasticsearch URL
    #[arg(long, default_value = "http://localhost:9200")]
    es_url: String,

    /// Elasticsearch index name
    #[arg(long, default_value = "districts")]
    index: String,
}

/// Application state shared across handlers
struct AppState {
    resolver: Resolver,
    es_directory: Option<EsDirectory>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Banyan Query Server");

    let (directory, es_directory): (Arc<dyn DistrictLookup>, Option<EsDirectory>) =
        if let Some(csv_path) = &args.districts_csv {
            let memory = MemoryDirectory::load_from_csv(csv_path)?;
            info!("Serving {} districts from memory", memory.len());
            (Arc::new(memory), None)
        } else {
            info!("Connecting to Elasticsearch at {}", args.es_url);
            let es = EsDirectory::new(&args.es_url, &args.index).await?;

            if !es.health_check().await? {
                anyhow::bail!("Elasticsearch cluster is not healthy");
            }

            let doc_count = es.doc_count().await?;
            info!(
                "Connected to index '{}' with {} districts",
                args.index, doc_count
            );
            (Arc::new(es.clone()), Some(es))
        };

    let state = Arc::new(AppState {
        resolver: Resolver::new(directory),
        es_directory,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/resolve", get(resolve_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let healthy = match &state.es_directory {
        Some(es) => es.health_check().await.unwrap_or(false),
        None => true,
    };

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        directory: healthy,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    directory: bool,
}

/// Resolve a free-text location to district ids
async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQueryParams>,
) -> Json<ResolveResponse> {
    let query = LocationQuery {
        location: params.location,
        province: params.province,
        address: params.address,
    };

    let start = Instant::now();
    let (district_ids, degraded) = match state.resolver.resolve(&query).await {
        Ok(ids) => (ids, false),
        Err(warning) => {
            warn!("{warning}");
            (warning.district_ids(), true)
        }
    };

    Json(ResolveResponse {
        district_ids,
        degraded,
        took_ms: start.elapsed().as_millis(),
    })
}

#[derive(Deserialize)]
struct ResolveQueryParams {
    /// Raw location string, e.g. "Sài Gòn/Bình Tân"
    location: Option<String>,
    /// Province hint
    province: Option<String>,
    /// Street address fallback
    address: Option<String>,
}

#[derive(Serialize)]
struct ResolveResponse {
    district_ids: Vec<DistrictId>,
    degraded: bool,
    took_ms: u128,
}
