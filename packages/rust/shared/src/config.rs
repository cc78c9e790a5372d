//! Application configuration for ExecIntel.
//!
//! User config lives at `~/.execintel/execintel.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file — only the names of the
//! environment variables that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExecIntelError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "execintel.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".execintel";

// ---------------------------------------------------------------------------
// Config structs (matching execintel.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Search backend settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Language-model backend settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Approximate token budget per text chunk.
    #[serde(default = "default_max_chunk_tokens")]
    pub max_chunk_tokens: usize,

    /// Shared deadline for one fetch batch, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Default result count for search sub-queries.
    #[serde(default = "default_search_count")]
    pub search_count: usize,

    /// Number of article results for topic news.
    #[serde(default = "default_article_count")]
    pub article_count: usize,

    /// Chunks consulted per biography sub-extraction.
    #[serde(default = "default_bio_chunk_limit")]
    pub bio_chunk_limit: usize,

    /// Chunks consulted per priorities sub-extraction.
    #[serde(default = "default_priorities_chunk_limit")]
    pub priorities_chunk_limit: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: default_max_chunk_tokens(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            search_count: default_search_count(),
            article_count: default_article_count(),
            bio_chunk_limit: default_bio_chunk_limit(),
            priorities_chunk_limit: default_priorities_chunk_limit(),
        }
    }
}

fn default_max_chunk_tokens() -> usize {
    1000
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_search_count() -> usize {
    3
}
fn default_article_count() -> usize {
    3
}
fn default_bio_chunk_limit() -> usize {
    4
}
fn default_priorities_chunk_limit() -> usize {
    2
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search backend endpoint (Bing-compatible web search API).
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_search_api_key_env(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://api.bing.microsoft.com/v7.0/search".into()
}
fn default_search_api_key_env() -> String {
    "EXECINTEL_SEARCH_API_KEY".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint of the completion backend.
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Model identifier passed through to the backend.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key_env: default_llm_api_key_env(),
        }
    }
}

fn default_llm_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".into()
}
fn default_llm_model() -> String {
    "moonshotai/kimi-k2.5".into()
}
fn default_llm_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline limits — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Approximate token budget per text chunk.
    pub max_chunk_tokens: usize,
    /// Shared deadline for one fetch batch.
    pub fetch_timeout: Duration,
    /// Default result count for search sub-queries.
    pub search_count: usize,
    /// Number of article results for topic news.
    pub article_count: usize,
    /// Chunks consulted per biography sub-extraction.
    pub bio_chunk_limit: usize,
    /// Chunks consulted per priorities sub-extraction.
    pub priorities_chunk_limit: usize,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_chunk_tokens: config.defaults.max_chunk_tokens,
            fetch_timeout: Duration::from_secs(config.defaults.fetch_timeout_secs),
            search_count: config.defaults.search_count,
            article_count: config.defaults.article_count,
            bio_chunk_limit: config.defaults.bio_chunk_limit,
            priorities_chunk_limit: config.defaults.priorities_chunk_limit,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.execintel/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ExecIntelError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.execintel/execintel.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ExecIntelError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ExecIntelError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ExecIntelError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ExecIntelError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ExecIntelError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the API key env vars named in the config are set and non-empty.
pub fn validate_api_keys(config: &AppConfig) -> Result<()> {
    for (label, var_name) in [
        ("search backend", &config.search.api_key_env),
        ("completion backend", &config.llm.api_key_env),
    ] {
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => {}
            _ => {
                return Err(ExecIntelError::config(format!(
                    "{label} API key not found. Set the {var_name} environment variable."
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("max_chunk_tokens"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_chunk_tokens, 1000);
        assert_eq!(parsed.defaults.fetch_timeout_secs, 10);
        assert_eq!(parsed.llm.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
max_chunk_tokens = 500

[llm]
model = "test/model"
"#;
        let config: AppConfig = toml_str.parse::<toml::Table>().unwrap().try_into().unwrap();
        assert_eq!(config.defaults.max_chunk_tokens, 500);
        assert_eq!(config.defaults.bio_chunk_limit, 4);
        assert_eq!(config.llm.model, "test/model");
        assert!(config.search.endpoint.contains("bing"));
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.max_chunk_tokens, 1000);
        assert_eq!(pipeline.fetch_timeout, Duration::from_secs(10));
        assert_eq!(pipeline.bio_chunk_limit, 4);
        assert_eq!(pipeline.priorities_chunk_limit, 2);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.search.api_key_env = "EI_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_keys(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
