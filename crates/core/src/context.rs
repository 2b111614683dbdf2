//! # Lookup Context
//!
//! Everything a lookup needs, built once at startup and shared by reference:
//! store, whitelist, cache, call logger and the fixed column layout.
//!
//! Build order from configuration is store → whitelist → cache → logger.
//! Tests inject their own components through [`LookupContextBuilder`].

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use sheetlink_common::config::{
    AppConfig, ColumnSettings, DatabaseSettings, DEFAULT_DATE_FORMAT, DEFAULT_TABLE_NAME,
};
use sheetlink_error::{ErrorCode, ErrorContext, Result, SheetlinkError};
use tracing::info;

use crate::cache::{CacheConfig, CacheStats, QueryCache};
use crate::call_log::CallLogger;
use crate::executor::{QueryStore, SqliteStore};
use crate::sanitize::quote_ident;
use crate::schema::{build_whitelist, FieldWhitelist};
use crate::value::{QueryKey, SharedResultSet, SqlValue};

pub struct LookupContext {
    store: Arc<dyn QueryStore>,
    table_name: String,
    quoted_table: String,
    date_format: String,
    columns: ColumnSettings,
    fallback_fields: Vec<String>,
    whitelist: RwLock<Arc<FieldWhitelist>>,
    cache: QueryCache,
    logger: CallLogger,
}

impl LookupContext {
    pub fn builder(store: Arc<dyn QueryStore>) -> LookupContextBuilder {
        LookupContextBuilder::new(store)
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = SqliteStore::new(&config.database.db_path, config.database.query_timeout());

        let context = Self::builder(Arc::new(store))
            .table_name(&config.database.table_name)
            .date_format(&config.database.date_format)
            .columns(config.columns.clone())
            .fallback_fields(config.database.fallback_fields())
            .cache(CacheConfig::from(&config.cache))
            .logger(CallLogger::from_settings(&config.logging))
            .build()?;

        info!(
            target: "startup",
            store = %context.store.describe(),
            table = %context.table_name,
            whitelist = %context.whitelist().source(),
            call_log = %context.logger.describe(),
            "Lookup context ready"
        );
        Ok(context)
    }

    /// Current whitelist snapshot.
    pub fn whitelist(&self) -> Arc<FieldWhitelist> {
        self.whitelist
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-run introspection and drop every cached result.
    pub fn reload_whitelist(&self) -> Arc<FieldWhitelist> {
        let fresh = Arc::new(build_whitelist(
            self.store.as_ref(),
            &self.table_name,
            &self.fallback_fields,
        ));
        *self.whitelist.write().unwrap_or_else(PoisonError::into_inner) = fresh.clone();
        self.cache.clear();
        fresh
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn store(&self) -> &dyn QueryStore {
        self.store.as_ref()
    }

    pub(crate) fn quoted_table(&self) -> &str {
        &self.quoted_table
    }

    pub(crate) fn date_format(&self) -> &str {
        &self.date_format
    }

    pub(crate) fn columns(&self) -> &ColumnSettings {
        &self.columns
    }

    pub(crate) fn logger(&self) -> &CallLogger {
        &self.logger
    }

    /// Run a read through the cache.
    pub(crate) fn fetch(&self, sql: String, params: Vec<SqlValue>) -> Result<SharedResultSet> {
        self.cache
            .get_or_execute(QueryKey::new(sql, params), |key| {
                self.store.execute(key.sql(), key.params())
            })
    }
}

impl fmt::Debug for LookupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupContext")
            .field("store", &self.store.describe())
            .field("table_name", &self.table_name)
            .field("date_format", &self.date_format)
            .field("whitelist", &self.whitelist().source())
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

pub struct LookupContextBuilder {
    store: Arc<dyn QueryStore>,
    table_name: String,
    date_format: String,
    columns: ColumnSettings,
    fallback_fields: Vec<String>,
    cache: CacheConfig,
    logger: Option<CallLogger>,
    whitelist: Option<FieldWhitelist>,
}

impl LookupContextBuilder {
    fn new(store: Arc<dyn QueryStore>) -> Self {
        Self {
            store,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            columns: ColumnSettings::default(),
            fallback_fields: DatabaseSettings::default().fallback_fields(),
            cache: CacheConfig::default(),
            logger: None,
            whitelist: None,
        }
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn columns(mut self, columns: ColumnSettings) -> Self {
        self.columns = columns;
        self
    }

    pub fn fallback_fields(mut self, fields: Vec<String>) -> Self {
        self.fallback_fields = fields;
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn logger(mut self, logger: CallLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Skip introspection and use `whitelist` as is.
    pub fn whitelist(mut self, whitelist: FieldWhitelist) -> Self {
        self.whitelist = Some(whitelist);
        self
    }

    pub fn build(self) -> Result<LookupContext> {
        let quoted_table = quote_ident(&self.table_name).map_err(|e| {
            SheetlinkError::new(
                ErrorCode::ConfigInvalid,
                format!("Invalid table name '{}': {}", self.table_name, e),
            )
            .with_context(ErrorContext::Config {
                file_path: None,
                field: Some("DATABASE.TABLE_NAME".to_string()),
            })
        })?;

        let whitelist = match self.whitelist {
            Some(whitelist) => whitelist,
            None => build_whitelist(self.store.as_ref(), &self.table_name, &self.fallback_fields),
        };

        Ok(LookupContext {
            store: self.store,
            table_name: self.table_name,
            quoted_table,
            date_format: self.date_format,
            columns: self.columns,
            fallback_fields: self.fallback_fields,
            whitelist: RwLock::new(Arc::new(whitelist)),
            cache: QueryCache::new(self.cache),
            logger: self.logger.unwrap_or_else(CallLogger::console),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::WhitelistSource;
    use crate::value::ResultSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Catalog that changes between introspections.
    struct EvolvingStore {
        columns: Mutex<Vec<String>>,
        executions: AtomicUsize,
    }

    impl QueryStore for EvolvingStore {
        fn execute(&self, _sql: &str, _params: &[SqlValue]) -> Result<ResultSet> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            Ok(ResultSet::new(
                vec!["price".into()],
                vec![vec![SqlValue::Real(87.5)]],
            ))
        }

        fn table_columns(&self, _table: &str) -> Result<Vec<String>> {
            Ok(self.columns.lock().unwrap().clone())
        }

        fn is_reachable(&self) -> bool {
            true
        }

        fn describe(&self) -> String {
            "evolving".to_string()
        }
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let store = Arc::new(EvolvingStore {
            columns: Mutex::new(vec![]),
            executions: AtomicUsize::new(0),
        });
        let err = LookupContext::builder(store)
            .table_name("metrics; DROP TABLE metrics")
            .build()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalid);
    }

    #[test]
    fn test_reload_picks_up_new_columns_and_clears_cache() {
        let store = Arc::new(EvolvingStore {
            columns: Mutex::new(vec!["date".into(), "price".into()]),
            executions: AtomicUsize::new(0),
        });
        let context = LookupContext::builder(store.clone()).build().unwrap();
        assert_eq!(context.whitelist().source(), WhitelistSource::Introspected);
        assert!(!context.whitelist().contains("volume"));

        context.fetch("SELECT 1".into(), vec![]).unwrap();
        context.fetch("SELECT 1".into(), vec![]).unwrap();
        assert_eq!(store.executions.load(Ordering::SeqCst), 1);

        store.columns.lock().unwrap().push("volume".into());
        let reloaded = context.reload_whitelist();
        assert!(reloaded.contains("volume"));
        assert_eq!(context.cache_stats().entry_count, 0);

        context.fetch("SELECT 1".into(), vec![]).unwrap();
        assert_eq!(store.executions.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_injected_whitelist_skips_introspection() {
        let store = Arc::new(EvolvingStore {
            columns: Mutex::new(vec!["volume".into()]),
            executions: AtomicUsize::new(0),
        });
        let context = LookupContext::builder(store)
            .whitelist(FieldWhitelist::from_fields(["price"]))
            .build()
            .unwrap();
        assert!(context.whitelist().contains("price"));
        assert!(!context.whitelist().contains("volume"));

        let debug = format!("{:?}", context);
        assert!(debug.contains("table_name: \"metrics\""));
        assert!(debug.contains("Fallback"));
    }
}
