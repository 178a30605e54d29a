use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use url::Url;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7578".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    /// Default result count for list endpoints.
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u64,
    /// Hard ceiling for explicit `num_results` values.
    #[serde(default = "default_max_items_per_page")]
    pub max_items_per_page: u64,
    /// Fixed page size of the search result page.
    #[serde(default = "default_search_results_per_page")]
    pub search_results_per_page: u64,
    /// Page numbers above this fall back to page 1.
    #[serde(default = "default_max_search_pages")]
    pub max_search_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
            max_items_per_page: default_max_items_per_page(),
            search_results_per_page: default_search_results_per_page(),
            max_search_pages: default_max_search_pages(),
        }
    }
}

fn default_items_per_page() -> u64 {
    10
}
fn default_max_items_per_page() -> u64 {
    100
}
fn default_search_results_per_page() -> u64 {
    10
}
fn default_max_search_pages() -> u64 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RagConfig {
    /// Maximum number of documents in one RAG answer request.
    #[serde(default = "default_max_rag_documents")]
    pub max_documents: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_documents: default_max_rag_documents(),
        }
    }
}

fn default_max_rag_documents() -> u64 {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            snippet_length: default_snippet_length(),
        }
    }
}

fn default_language() -> String {
    "English".to_string()
}
fn default_snippet_length() -> usize {
    300
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate backend
    Url::parse(&config.backend.base_url).with_context(|| {
        format!(
            "backend.base_url is not a valid URL: '{}'",
            config.backend.base_url
        )
    })?;
    if config.backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be > 0");
    }

    // Validate pagination
    if config.pagination.items_per_page == 0 {
        anyhow::bail!("pagination.items_per_page must be >= 1");
    }
    if config.pagination.search_results_per_page == 0 {
        anyhow::bail!("pagination.search_results_per_page must be >= 1");
    }
    if config.pagination.max_search_pages == 0 {
        anyhow::bail!("pagination.max_search_pages must be >= 1");
    }
    if config.pagination.max_items_per_page < config.pagination.items_per_page {
        anyhow::bail!("pagination.max_items_per_page must be >= pagination.items_per_page");
    }
    if config.pagination.search_results_per_page > config.pagination.max_items_per_page {
        anyhow::bail!(
            "pagination.search_results_per_page must be <= pagination.max_items_per_page"
        );
    }

    // Validate rag and display
    if config.rag.max_documents == 0 {
        anyhow::bail!("rag.max_documents must be >= 1");
    }
    if config.display.snippet_length == 0 {
        anyhow::bail!("display.snippet_length must be >= 1");
    }

    Ok(config)
}
