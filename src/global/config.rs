use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::CategoryDef;
use crate::global::error::ConfigError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppSettings {
    pub log_level: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_to_file")]
    pub log_to_file: bool,
    #[serde(default = "default_log_directory")]
    pub log_directory: String,
    #[serde(default = "default_log_file_prefix")]
    pub log_file_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub log_rotation: LogRotation,
    #[serde(default = "default_log_to_console")]
    pub log_to_console: bool,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

fn default_log_to_file() -> bool {
    false
}

fn default_log_directory() -> String {
    "./logs".to_string()
}

fn default_log_file_prefix() -> String {
    "media-catalog".to_string()
}

fn default_log_rotation() -> LogRotation {
    LogRotation::Daily
}

fn default_log_to_console() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_to_file: default_log_to_file(),
            log_directory: default_log_directory(),
            log_file_prefix: default_log_file_prefix(),
            log_rotation: default_log_rotation(),
            log_to_console: default_log_to_console(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub default_rate_limit: f64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_tmdb_rate_limit")]
    pub rate_limit: f64,
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
    #[serde(default = "default_tmdb_language")]
    pub language: String,
}

fn default_tmdb_rate_limit() -> f64 {
    20.0
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            rate_limit: default_tmdb_rate_limit(),
            base_url: default_tmdb_base_url(),
            language: default_tmdb_language(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
    /// How long the API reuses one read of the catalog list.
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_seconds: u64,
}

fn default_cache_capacity() -> usize {
    2_000
}

fn default_cache_ttl() -> u64 {
    6 * 60 * 60
}

fn default_snapshot_ttl() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_seconds: default_cache_ttl(),
            snapshot_ttl_seconds: default_snapshot_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_inter_batch_delay")]
    pub inter_batch_delay_ms: u64,
}

fn default_batch_size() -> usize {
    50
}

fn default_concurrency() -> usize {
    5
}

fn default_inter_batch_delay() -> u64 {
    1_000
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            inter_batch_delay_ms: default_inter_batch_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default)]
    pub categories: Vec<CategoryDef>,
    /// Category names composing the home page, in claim order.
    #[serde(default)]
    pub home_sections: Vec<HomeSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HomeSection {
    pub category: String,
    pub quota: usize,
}

fn default_page_size() -> usize {
    20
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            categories: Vec::new(),
            home_sections: Vec::new(),
        }
    }
}

impl CatalogConfig {
    pub fn category(&self, name: &str) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| c.name == name)
    }
}

impl AppConfig {
    /// Load configuration from config.toml, with `MEDIA_CATALOG__SECTION__KEY`
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config"))
            .add_source(config::Environment::with_prefix("MEDIA_CATALOG").separator("__"))
            .build()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        Self::from_config(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        Self::from_config(config)
    }

    fn from_config(config: config::Config) -> Result<Self, ConfigError> {
        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject catalog settings the paginator cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.default_page_size == 0 {
            return Err(ConfigError::Invalid("catalog.default_page_size must be > 0".into()));
        }

        for (index, category) in self.catalog.categories.iter().enumerate() {
            if category.page_size == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "category '{}' has a zero page_size",
                    category.name
                )));
            }
            if self.catalog.categories[..index]
                .iter()
                .any(|other| other.name == category.name)
            {
                return Err(ConfigError::Invalid(format!(
                    "category '{}' is defined twice",
                    category.name
                )));
            }
        }

        for section in &self.catalog.home_sections {
            if self.catalog.category(&section.category).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "home section refers to unknown category '{}'",
                    section.category
                )));
            }
        }

        Ok(())
    }

    /// Check that the TMDB provider is enabled and has a key.
    pub fn validate_tmdb(&self) -> Result<(), ConfigError> {
        if !self.tmdb.enabled {
            return Err(ConfigError::Invalid("tmdb is disabled".into()));
        }
        if self.tmdb.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey("tmdb".into()));
        }
        Ok(())
    }

    /// Whether the metadata provider can be started. Logs the reason if not.
    pub fn can_start_tmdb(&self) -> bool {
        match self.validate_tmdb() {
            Ok(_) => true,
            Err(e) => {
                warn!(provider = "tmdb", error = %e, "Metadata provider cannot start due to configuration issue");
                false
            }
        }
    }

    /// Rate limit for the provider, falling back to the HTTP default.
    pub fn tmdb_rate_limit(&self) -> f64 {
        if self.tmdb.rate_limit > 0.0 {
            self.tmdb.rate_limit
        } else {
            self.http.default_rate_limit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CategoryRule;

    const SAMPLE: &str = r#"
[app]
log_level = "debug"

[database]
host = "localhost"
port = 27017
name = "catalog"

[http]
timeout_seconds = 30
user_agent = "media-catalog/0.1.0"
default_rate_limit = 10.0

[http.retry]
max_retries = 3
base_delay_ms = 500
max_delay_ms = 30000

[tmdb]
enabled = true
api_key = "secret"

[catalog]
default_page_size = 7

[[catalog.categories]]
name = "trending"
rule = { rule = "all" }

[[catalog.categories]]
name = "action"
rule = { rule = "genre", value = "Action" }
page_size = 20

[[catalog.home_sections]]
category = "trending"
quota = 7

[[catalog.home_sections]]
category = "action"
quota = 7
"#;

    #[test]
    fn parses_sample_configuration() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.app.log_level, "debug");
        assert!(!config.app.logging.log_to_file);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.catalog.default_page_size, 7);
        assert_eq!(config.catalog.categories.len(), 2);
        assert_eq!(
            config.catalog.category("action").map(|c| &c.rule),
            Some(&CategoryRule::Genre("Action".into()))
        );
        assert_eq!(config.import.batch_size, 50);
        assert!(config.can_start_tmdb());
    }

    #[test]
    fn rejects_unknown_home_category() {
        let raw = SAMPLE.replace("category = \"action\"", "category = \"horror\"");
        assert!(matches!(AppConfig::from_toml(&raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_duplicate_categories() {
        let raw = SAMPLE.replace("name = \"action\"", "name = \"trending\"");
        assert!(matches!(AppConfig::from_toml(&raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_api_key_disables_provider() {
        let raw = SAMPLE.replace("api_key = \"secret\"", "api_key = \"\"");
        let config = AppConfig::from_toml(&raw).unwrap();
        assert!(matches!(config.validate_tmdb(), Err(ConfigError::MissingApiKey(_))));
        assert!(!config.can_start_tmdb());
    }
}
