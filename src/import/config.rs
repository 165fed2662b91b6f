use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DirectoryConfig {
    pub districts_csv: Option<PathBuf>,
    pub es_url: Option<String>,
    pub index: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ImportConfig {
    pub concurrency: Option<usize>,
    pub output: Option<PathBuf>,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
