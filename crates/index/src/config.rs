//! Index configuration management.
//!
//! Loaded from `.marquee/index/config.yaml`; the persisted index itself lives
//! in `.marquee/index/store/`.

use crate::embeddings::EmbeddingConfig;
use crate::error::{IndexError, IndexResult};
use crate::types::SearchStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// When deferred updates are written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FlushPolicy {
    /// Flush once this many documents are pending.
    /// `None` uses the batch size of the update call.
    PendingCount {
        #[serde(default)]
        threshold: Option<usize>,
    },
    /// Flush when pending documents exist and this long has passed since
    /// the last successful persist.
    Interval { seconds: u64 },
    /// Only `persist()` and `cleanup()` write to disk.
    Explicit,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::PendingCount { threshold: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexConfig {
    /// Embedding vector length; every insert and search is checked against it
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Number of clusters for the approximate variant
    #[serde(default = "default_nlist")]
    pub nlist: usize,

    /// Clusters probed per approximate search
    #[serde(default = "default_nprobe")]
    pub nprobe: usize,

    /// Query cache capacity; 0 disables the cache
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_build_batch_size")]
    pub build_batch_size: usize,

    #[serde(default = "default_update_batch_size")]
    pub update_batch_size: usize,

    /// Vectors sampled when retraining the approximate variant
    #[serde(default = "default_train_sample_size")]
    pub train_sample_size: usize,

    /// Seed for k-means initialization and training samples
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub flush_policy: FlushPolicy,

    /// Strategy a freshly loaded or built index starts with
    #[serde(default)]
    pub default_strategy: SearchStrategy,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Directory holding `index.bin` and `documents.json`
    #[serde(skip)]
    pub store_dir: PathBuf,
}

fn default_dimension() -> usize {
    384
}

fn default_nlist() -> usize {
    100
}

fn default_nprobe() -> usize {
    8
}

fn default_cache_size() -> usize {
    1000
}

fn default_build_batch_size() -> usize {
    1000
}

fn default_update_batch_size() -> usize {
    100
}

fn default_train_sample_size() -> usize {
    10_000
}

fn default_seed() -> u64 {
    42
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            nlist: default_nlist(),
            nprobe: default_nprobe(),
            cache_size: default_cache_size(),
            build_batch_size: default_build_batch_size(),
            update_batch_size: default_update_batch_size(),
            train_sample_size: default_train_sample_size(),
            seed: default_seed(),
            flush_policy: FlushPolicy::default(),
            default_strategy: SearchStrategy::default(),
            embedding: EmbeddingConfig::default(),
            store_dir: PathBuf::from(".marquee/index/store"),
        }
    }
}

impl IndexConfig {
    /// Default configuration rooted at `store_dir`.
    pub fn with_store_dir(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> IndexResult<()> {
        let positive = [
            ("dimension", self.dimension),
            ("nlist", self.nlist),
            ("nprobe", self.nprobe),
            ("buildBatchSize", self.build_batch_size),
            ("updateBatchSize", self.update_batch_size),
            ("trainSampleSize", self.train_sample_size),
        ];

        for (name, value) in positive {
            if value == 0 {
                return Err(IndexError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if let FlushPolicy::PendingCount {
            threshold: Some(0),
        } = self.flush_policy
        {
            return Err(IndexError::Configuration(
                "flush threshold must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load index configuration for a workspace, falling back to defaults.
pub fn load_config(workspace: &Path) -> IndexResult<IndexConfig> {
    let config_path = get_config_path(workspace);

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(|e| {
            IndexError::Configuration(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let config: IndexConfig = serde_yaml::from_str(&content).map_err(|e| {
            IndexError::Configuration(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Loaded index config from {:?}", config_path);
        config
    } else {
        tracing::debug!("Using default index config (no config file found)");
        IndexConfig::default()
    };

    config.store_dir = get_store_dir(workspace);
    config.validate()?;

    Ok(config)
}

/// Save index configuration for a workspace.
pub fn save_config(workspace: &Path, config: &IndexConfig) -> IndexResult<()> {
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            IndexError::Configuration(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| IndexError::Configuration(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        IndexError::Configuration(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved index config to {:?}", config_path);
    Ok(())
}

pub fn get_index_dir(workspace: &Path) -> PathBuf {
    workspace.join(".marquee").join("index")
}

pub fn get_config_path(workspace: &Path) -> PathBuf {
    get_index_dir(workspace).join("config.yaml")
}

pub fn get_store_dir(workspace: &Path) -> PathBuf {
    get_index_dir(workspace).join("store")
}
