//! Configuration management for marquee.
//!
//! Configuration is merged from, in increasing precedence:
//! - Built-in defaults
//! - The workspace config file (.marquee/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! All workspace state (config, prompt overrides, the persisted index) lives
//! under `.marquee/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .marquee/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Movie dataset (`.csv` metadata export, or JSON Lines)
    pub data_file: Option<PathBuf>,

    /// Text generation provider (e.g., "ollama", "azure-openai")
    pub provider: String,

    /// Generation model identifier (deployment name for Azure)
    pub model: String,

    /// API key for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Generation provider configurations
    pub llm: Option<LlmConfig>,

    /// Retrieval and answer shaping
    pub recommender: RecommenderSettings,
}

/// Generation provider table from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ProviderConfig {
    AzureOpenAI {
        endpoint: String,
        deployment: String,
        #[serde(rename = "apiVersion")]
        api_version: String,
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model (or deployment) used for completions.
    pub fn model(&self) -> &str {
        match self {
            Self::AzureOpenAI { deployment, .. } => deployment,
            Self::Ollama { model, .. } => model,
        }
    }

    /// Base URL of the provider.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::AzureOpenAI { endpoint, .. } => endpoint,
            Self::Ollama { endpoint, .. } => endpoint,
        }
    }
}

/// Recommendation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommenderSettings {
    /// Movies retrieved per recommendation
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Rows with a budget at or below this are dropped at ingestion
    #[serde(rename = "minBudget", default = "default_min_budget")]
    pub min_budget: f64,

    /// Candidates retrieved before applying rating/budget/genre filters
    #[serde(rename = "filterPool", default = "default_filter_pool")]
    pub filter_pool: usize,
}

fn default_top_k() -> usize {
    3
}

fn default_min_budget() -> f64 {
    1_000_000.0
}

fn default_filter_pool() -> usize {
    50
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_budget: default_min_budget(),
            filter_pool: default_filter_pool(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    data: Option<DataConfig>,
    recommender: Option<RecommenderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataConfig {
    path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            data_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            recommender: RecommenderSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the workspace config file and the
    /// environment.
    ///
    /// Environment variables:
    /// - `MARQUEE_WORKSPACE`: Override workspace path
    /// - `MARQUEE_CONFIG`: Path to config file
    /// - `MARQUEE_DATA`: Path to the movie dataset
    /// - `MARQUEE_PROVIDER`: Generation provider
    /// - `MARQUEE_MODEL`: Model identifier
    /// - `MARQUEE_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use marquee_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("MARQUEE_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("MARQUEE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.workspace.join(".marquee/config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(data) = std::env::var("MARQUEE_DATA") {
            config.data_file = Some(PathBuf::from(data));
        }

        if let Ok(provider) = std::env::var("MARQUEE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("MARQUEE_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("MARQUEE_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(path) = config_file.data.and_then(|d| d.path) {
            result.data_file = Some(PathBuf::from(path));
        }

        if let Some(recommender) = config_file.recommender {
            result.recommender = recommender;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .marquee directory.
    pub fn marquee_dir(&self) -> PathBuf {
        self.workspace.join(".marquee")
    }

    /// Ensure the .marquee directory exists.
    pub fn ensure_marquee_dir(&self) -> AppResult<()> {
        let dir = self.marquee_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .marquee directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Dataset path, falling back to `data/movies_metadata.csv` in the workspace.
    pub fn data_path(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(|| self.workspace.join("data").join("movies_metadata.csv"))
    }

    /// Get a provider's configuration.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the API key: explicit MARQUEE_API_KEY first, then the
    /// provider's `apiKeyEnv` variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::AzureOpenAI { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["ollama", "azure-openai", "azure"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: ollama, azure-openai",
                self.provider
            )));
        }

        if self.recommender.top_k == 0 {
            return Err(AppError::Config("recommender.topK must be at least 1".to_string()));
        }

        if let Some(ProviderConfig::AzureOpenAI { api_key_env, .. }) =
            self.get_provider_config(&self.provider)
        {
            if self.api_key.is_none() && std::env::var(api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        Ok(())
    }
}
