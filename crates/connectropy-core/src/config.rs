//! Pipeline configuration, loadable from a JSON file.
//!
//! Every field has a default, so `{}` is a valid config.

use crate::formats::{EdgeColumns, MetadataColumns};
use crate::store::Encoding;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Column names of the edge list.
    #[serde(default)]
    pub edge_columns: EdgeColumns,

    /// Column names of the metadata table.
    #[serde(default)]
    pub metadata_columns: MetadataColumns,

    /// Explicit category axis; first-observed metadata order when absent.
    #[serde(default)]
    pub categories: Option<Vec<String>>,

    /// Restrict specialization output to these nodes.
    #[serde(default)]
    pub nodes: Option<Vec<String>>,

    /// Sum duplicate `(source, sink)` edges after loading.
    #[serde(default = "default_true")]
    pub aggregate: bool,

    /// Annotate fingerprint rows with their entropy.
    #[serde(default = "default_true")]
    pub with_entropy: bool,

    /// Build fingerprints in parallel (needs the `parallel` feature).
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Default number of hubs to report.
    #[serde(default = "default_top")]
    pub top: usize,

    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding cached tables.
    pub dir: PathBuf,

    /// Dataset key; cached files are named `<key>_<artifact>.<ext>`.
    #[serde(default = "default_cache_key")]
    pub key: String,

    #[serde(default)]
    pub encoding: Encoding,
}

fn default_true() -> bool {
    true
}
fn default_top() -> usize {
    10
}
fn default_cache_key() -> String {
    "connectropy".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            edge_columns: EdgeColumns::default(),
            metadata_columns: MetadataColumns::default(),
            categories: None,
            nodes: None,
            aggregate: default_true(),
            with_entropy: default_true(),
            parallel: default_true(),
            top: default_top(),
            cache: None,
        }
    }
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            key: default_cache_key(),
            encoding: Encoding::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot produce any output.
    pub fn validate(&self) -> Result<()> {
        if self.categories.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::EmptyCategories);
        }
        if self.nodes.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::InvalidConfig("`nodes` is present but empty".into()));
        }
        if self.top == 0 {
            return Err(Error::InvalidConfig("`top` must be at least 1".into()));
        }
        if let Some(cache) = &self.cache {
            if cache.key.trim().is_empty() {
                return Err(Error::InvalidConfig("cache key is empty".into()));
            }
        }
        Ok(())
    }
}
