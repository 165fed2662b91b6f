//! Listing record import pipeline.
//!
//! Reads crawled listing records, resolves district assignments,
//! and writes enriched records for the application importer.

mod config;

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use walkdir::WalkDir;

use banyan::directory::{DistrictLookup, EsDirectory, MemoryDirectory};
use banyan::models::{ListingRecord, ResolvedListing};
use banyan::resolver::Resolver;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "import")]
#[command(about = "Resolve district assignments for crawled listing records")]
struct Args {
    /// JSON or JSONL file of listing records
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Directory of record files (.json/.jsonl), scanned recursively
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// District directory CSV seed
    #[arg(long)]
    districts_csv: Option<PathBuf>,

    /// Elasticsearch URL for the district index
    #[arg(long)]
    es_url: Option<String>,

    /// Elasticsearch index name
    #[arg(long, default_value = "districts")]
    index: String,

    /// Concurrent resolutions
    #[arg(long, default_value = "8")]
    concurrency: usize,

    /// Output JSONL path
    #[arg(short, long, default_value = "resolved.jsonl")]
    output: PathBuf,

    /// Optional TOML config providing the same settings; CLI args win
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = Args::parse();

    if let Some(path) = args.config.clone() {
        let config = Config::load_from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        merge_config(&mut args, config);
    }

    info!("Banyan Import Pipeline");

    let directory = build_directory(&args).await?;
    let resolver = Arc::new(Resolver::new(directory));

    let files = collect_input_files(&args)?;
    if files.is_empty() {
        anyhow::bail!("No input records given (use --file or --dir)");
    }

    let mut records = Vec::new();
    for path in &files {
        let mut file_records = read_records(path)
            .with_context(|| format!("Failed to read records from {}", path.display()))?;
        info!("{}: {} records", path.display(), file_records.len());
        records.append(&mut file_records);
    }

    info!("Resolving districts for {} records", records.len());

    let progress = ProgressBar::new(records.len() as u64);
    progress.set_style(ProgressStyle::default_bar().template("{bar:40} {pos}/{len} {msg}")?);

    let import_timestamp = Utc::now();
    let outcomes: Vec<(ResolvedListing, bool)> = stream::iter(records)
        .map(|record| {
            let resolver = resolver.clone();
            let progress = progress.clone();
            async move {
                let query = record.location_query();
                let (district_ids, degraded) = match resolver.resolve(&query).await {
                    Ok(ids) => (ids, false),
                    Err(warning) => {
                        // Do not kill the batch, log and move on
                        warn!("{warning}");
                        (warning.district_ids(), true)
                    }
                };
                progress.inc(1);
                (
                    ResolvedListing {
                        record,
                        district_ids,
                        import_timestamp,
                    },
                    degraded,
                )
            }
        })
        .buffer_unordered(args.concurrency)
        .collect()
        .await;
    progress.finish_and_clear();

    let assigned = outcomes
        .iter()
        .filter(|(r, _)| !r.district_ids.is_empty())
        .count();
    let degraded = outcomes.iter().filter(|(_, d)| *d).count();
    let unmatched = outcomes.len() - assigned;

    write_output(&args.output, outcomes.iter().map(|(r, _)| r))?;

    info!(
        "Wrote {} records to {}",
        outcomes.len(),
        args.output.display()
    );
    info!(
        "{} assigned to at least one district, {} unmatched, {} degraded",
        assigned, unmatched, degraded
    );

    Ok(())
}

/// Fill unset CLI args from the config file.
fn merge_config(args: &mut Args, config: Config) {
    if args.districts_csv.is_none() {
        args.districts_csv = config.directory.districts_csv;
    }
    if args.es_url.is_none() {
        args.es_url = config.directory.es_url;
    }
    if let Some(index) = config.directory.index {
        args.index = index;
    }
    if let Some(concurrency) = config.import.concurrency {
        args.concurrency = concurrency;
    }
    if let Some(output) = config.import.output {
        args.output = output;
    }
}

async fn build_directory(args: &Args) -> Result<Arc<dyn DistrictLookup>> {
    if let Some(csv_path) = &args.districts_csv {
        let directory = MemoryDirectory::load_from_csv(csv_path)?;
        Ok(Arc::new(directory))
    } else if let Some(es_url) = &args.es_url {
        info!("Connecting to Elasticsearch at {}", es_url);
        let directory = EsDirectory::new(es_url, &args.index)
            .await
            .context("Failed to connect to Elasticsearch")?;

        if !directory.health_check().await? {
            anyhow::bail!("Elasticsearch cluster is not healthy");
        }

        let doc_count = directory.doc_count().await?;
        info!(
            "Connected to district index '{}' with {} documents",
            args.index, doc_count
        );
        Ok(Arc::new(directory))
    } else {
        anyhow::bail!("No district directory given (use --districts-csv or --es-url)")
    }
}

/// Gather record files from --file and --dir.
fn collect_input_files(args: &Args) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if let Some(file) = &args.file {
        files.push(file.clone());
    }

    if let Some(dir) = &args.dir {
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("json") | Some("jsonl") => files.push(path.to_path_buf()),
                _ => {}
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Read records from a JSON array file or a JSONL file.
fn read_records(path: &Path) -> Result<Vec<ListingRecord>> {
    let is_jsonl = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e == "jsonl");

    if is_jsonl {
        let file = File::open(path)?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    } else {
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(Into::into))
                .collect(),
            object => Ok(vec![serde_json::from_value(object)?]),
        }
    }
}

fn write_output<'a, I>(path: &Path, resolved: I) -> Result<()>
where
    I: Iterator<Item = &'a ResolvedListing>,
{
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for record in resolved {
        serde_json::to_writer(&mut writer, record)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    Ok(())
}
