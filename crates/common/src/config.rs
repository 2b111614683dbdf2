use serde::Deserialize;
use sheetlink_error::{ErrorCode, ErrorContext, SheetlinkError};
use std::path::Path;
use std::time::Duration;
use tracing::warn;
use validator::Validate;

// Default constants
pub const DEFAULT_CONFIG_PATH: &str = "config.ini";
pub const ENV_PREFIX: &str = "SHEETLINK";

pub const DEFAULT_DB_PATH: &str = "metrics.db";
pub const DEFAULT_TABLE_NAME: &str = "metrics";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_FALLBACK_FIELDS: &str = "entityId,companyName,sector,category,date,price";

pub const DEFAULT_LOG_FILE: &str = "query_log.txt";
pub const DEFAULT_MAX_BYTES: u64 = 1_048_576;
pub const DEFAULT_BACKUP_COUNT: usize = 5;

pub const DEFAULT_CACHE_ENABLED: bool = true;
pub const DEFAULT_CACHE_CAPACITY: usize = 128;
pub const DEFAULT_NOT_FOUND_TTL_SECS: u64 = 300;

#[derive(Debug, Deserialize, Clone, Default, Validate)]
pub struct AppConfig {
    #[serde(default, alias = "DATABASE")]
    #[validate(nested)]
    pub database: DatabaseSettings,
    #[serde(default, alias = "LOGGING")]
    #[validate(nested)]
    pub logging: LoggingSettings,
    #[serde(default, alias = "CACHE")]
    #[validate(nested)]
    pub cache: CacheSettings,
    #[serde(default, alias = "COLUMNS")]
    #[validate(nested)]
    pub columns: ColumnSettings,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path", alias = "DB_PATH")]
    #[validate(length(min = 1))]
    pub db_path: String,

    #[serde(default = "default_table_name", alias = "TABLE_NAME")]
    #[validate(length(min = 1, max = 128))]
    pub table_name: String,

    #[serde(default = "default_date_format", alias = "DATE_FORMAT")]
    #[validate(length(min = 1))]
    pub date_format: String,

    #[serde(default = "default_query_timeout_ms", alias = "QUERY_TIMEOUT_MS")]
    #[validate(range(min = 1))]
    pub query_timeout_ms: u64,

    /// Comma-separated whitelist used when the table cannot be introspected
    #[serde(default = "default_fallback_fields", alias = "FALLBACK_FIELDS")]
    pub fallback_fields: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            table_name: default_table_name(),
            date_format: default_date_format(),
            query_timeout_ms: default_query_timeout_ms(),
            fallback_fields: default_fallback_fields(),
        }
    }
}

impl DatabaseSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn fallback_fields(&self) -> Vec<String> {
        self.fallback_fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

fn default_fallback_fields() -> String {
    DEFAULT_FALLBACK_FIELDS.to_string()
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct LoggingSettings {
    #[serde(default = "default_log_file", alias = "LOG_FILE")]
    #[validate(length(min = 1))]
    pub log_file: String,

    #[serde(default = "default_max_bytes", alias = "MAX_BYTES")]
    #[validate(range(min = 1))]
    pub max_bytes: u64,

    #[serde(default = "default_backup_count", alias = "BACKUP_COUNT")]
    pub backup_count: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            max_bytes: default_max_bytes(),
            backup_count: default_backup_count(),
        }
    }
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

fn default_backup_count() -> usize {
    DEFAULT_BACKUP_COUNT
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct CacheSettings {
    #[serde(default = "default_cache_enabled", alias = "ENABLED")]
    pub enabled: bool,

    #[serde(default = "default_cache_capacity", alias = "CAPACITY")]
    #[validate(range(min = 1))]
    pub capacity: usize,

    /// How long an empty result stays cached; 0 never caches empty results
    #[serde(default = "default_not_found_ttl_secs", alias = "NOT_FOUND_TTL_SECS")]
    pub not_found_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            capacity: default_cache_capacity(),
            not_found_ttl_secs: default_not_found_ttl_secs(),
        }
    }
}

fn default_cache_enabled() -> bool {
    DEFAULT_CACHE_ENABLED
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_not_found_ttl_secs() -> u64 {
    DEFAULT_NOT_FOUND_TTL_SECS
}

/// Names of the fixed columns used by the lookup projections.
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ColumnSettings {
    #[serde(default = "default_entity_id_column", alias = "ENTITY_ID")]
    #[validate(length(min = 1))]
    pub entity_id: String,

    #[serde(default = "default_name_column", alias = "NAME")]
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default = "default_sector_column", alias = "SECTOR")]
    #[validate(length(min = 1))]
    pub sector: String,

    #[serde(default = "default_category_column", alias = "CATEGORY")]
    #[validate(length(min = 1))]
    pub category: String,

    #[serde(default = "default_date_column", alias = "DATE")]
    #[validate(length(min = 1))]
    pub date: String,
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self {
            entity_id: default_entity_id_column(),
            name: default_name_column(),
            sector: default_sector_column(),
            category: default_category_column(),
            date: default_date_column(),
        }
    }
}

fn default_entity_id_column() -> String {
    "entityId".to_string()
}

fn default_name_column() -> String {
    "companyName".to_string()
}

fn default_sector_column() -> String {
    "sector".to_string()
}

fn default_category_column() -> String {
    "category".to_string()
}

fn default_date_column() -> String {
    "date".to_string()
}

impl AppConfig {
    /// Strict load: file (if present) overlaid with `SHEETLINK_<SECTION>__<KEY>`
    /// environment variables, then validated.
    pub fn from_file(path: &str) -> sheetlink_error::Result<Self> {
        let builder = config::Config::builder();

        let builder = if Path::new(path).exists() {
            builder.add_source(config::File::from(Path::new(path)))
        } else {
            builder
        };

        // Map SHEETLINK_DATABASE__DB_PATH to database.db_path, etc.
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().map_err(|e| with_file(e.into(), path))?;

        let app_config: AppConfig = cfg.try_deserialize().map_err(|e| with_file(e.into(), path))?;

        app_config.validate().map_err(|e| {
            SheetlinkError::new(
                ErrorCode::ConfigInvalid,
                format!("Configuration validation failed: {}", e),
            )
            .with_context(ErrorContext::Config {
                file_path: Some(path.to_string()),
                field: None,
            })
        })?;

        Ok(app_config)
    }

    /// Startup load: never fails. A missing, malformed or invalid file falls
    /// back to built-in defaults with a warning on stderr.
    pub fn load(path: &str) -> Self {
        if !Path::new(path).exists() {
            warn!(path, "Config file not found. Using defaults.");
        }

        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path, error = %e, "Could not load configuration. Using defaults.");
                Self::default()
            }
        }
    }
}

fn with_file(mut err: SheetlinkError, path: &str) -> SheetlinkError {
    let field = match err.context.take() {
        Some(ErrorContext::Config { field, .. }) => field,
        _ => None,
    };
    err.with_context(ErrorContext::Config {
        file_path: Some(path.to_string()),
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp config");
        file.write_all(body.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.table_name, "metrics");
        assert_eq!(config.logging.max_bytes, 1_048_576);
        assert_eq!(config.logging.backup_count, 5);
        assert_eq!(config.cache.capacity, 128);
        assert_eq!(
            config.database.fallback_fields(),
            vec!["entityId", "companyName", "sector", "category", "date", "price"]
        );
    }

    #[test]
    #[serial]
    fn test_ini_file_with_upper_case_keys() {
        let file = write_config(
            ".ini",
            "[DATABASE]\nDB_PATH = data/mcap.db\nTABLE_NAME = mcap\nDATE_FORMAT = %Y-%m-%d\n\n\
             [LOGGING]\nLOG_FILE = logs/query_log.txt\nMAX_BYTES = 2048\nBACKUP_COUNT = 2\n",
        );

        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.database.db_path, "data/mcap.db");
        assert_eq!(config.database.table_name, "mcap");
        assert_eq!(config.logging.log_file, "logs/query_log.txt");
        assert_eq!(config.logging.max_bytes, 2048);
        assert_eq!(config.logging.backup_count, 2);
        // Untouched sections keep their defaults
        assert_eq!(config.cache.capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.columns.entity_id, "entityId");
    }

    #[test]
    #[serial]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("/nonexistent/sheetlink/config.ini");
        assert_eq!(config.database.db_path, DEFAULT_DB_PATH);
        assert_eq!(config.logging.log_file, DEFAULT_LOG_FILE);
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected_then_defaulted() {
        let file = write_config(".ini", "[CACHE]\nCAPACITY = 0\n");
        let path = file.path().to_str().unwrap();

        let err = AppConfig::from_file(path).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalid);

        let config = AppConfig::load(path);
        assert_eq!(config.cache.capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("SHEETLINK_DATABASE__TABLE_NAME", "prices");
        std::env::set_var("SHEETLINK_CACHE__ENABLED", "false");
        std::env::set_var("SHEETLINK_DATABASE__DB_PATH", "/data/metrics.db");

        let config = AppConfig::from_file("/nonexistent/config.ini").unwrap();
        assert_eq!(config.database.table_name, "prices");
        assert_eq!(config.database.db_path, "/data/metrics.db");
        assert!(!config.cache.enabled);

        std::env::remove_var("SHEETLINK_DATABASE__TABLE_NAME");
        std::env::remove_var("SHEETLINK_CACHE__ENABLED");
        std::env::remove_var("SHEETLINK_DATABASE__DB_PATH");
    }
}
