//! # Schema Introspection
//!
//! Builds the [`FieldWhitelist`]: the only column names that may ever appear
//! in SQL text. Built once at startup from the table's declared columns and
//! never mutated afterwards.
//!
//! Introspection never fails. An unreachable store, an unknown table or a
//! catalog error all degrade to the configured fallback set, with a warning
//! on stderr (the call log is reserved for lookups).

use std::collections::HashSet;
use std::fmt;

use sheetlink_error::{ErrorCode, ErrorContext, Result, SheetlinkError};
use tracing::{info, warn};

use crate::executor::QueryStore;

/// Where a whitelist came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistSource {
    /// Read from the store's catalog
    Introspected,
    /// Built-in/configured default set
    Fallback,
}

impl fmt::Display for WhitelistSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhitelistSource::Introspected => write!(f, "introspected"),
            WhitelistSource::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWhitelist {
    fields: HashSet<String>,
    source: WhitelistSource,
}

impl FieldWhitelist {
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            source: WhitelistSource::Fallback,
        }
    }

    fn introspected(fields: Vec<String>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            source: WhitelistSource::Introspected,
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Fields in alphabetical order, for display.
    pub fn sorted(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.iter().collect();
        fields.sort_unstable();
        fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn source(&self) -> WhitelistSource {
        self.source
    }
}

/// Read `table`'s columns from `store`, falling back to `fallback`.
pub fn build_whitelist(store: &dyn QueryStore, table: &str, fallback: &[String]) -> FieldWhitelist {
    match read_columns(store, table) {
        Ok(columns) => {
            info!(
                target: "startup",
                table,
                fields = columns.len(),
                "Field whitelist introspected"
            );
            FieldWhitelist::introspected(columns)
        }
        Err(e) => {
            warn!(
                target: "startup",
                table,
                code = %e.code,
                error = %e.message,
                "Could not populate field whitelist from store; using fallback"
            );
            FieldWhitelist::from_fields(fallback.iter().cloned())
        }
    }
}

/// Declared columns of `table`, or why there are none to use.
fn read_columns(store: &dyn QueryStore, table: &str) -> Result<Vec<String>> {
    let failed = |message: String| {
        SheetlinkError::new(ErrorCode::SchemaIntrospectionFailed, message).with_context(
            ErrorContext::Store {
                path: Some(store.describe()),
                table: Some(table.to_string()),
            },
        )
    };

    if !store.is_reachable() {
        return Err(failed(format!("Store not found: {}", store.describe())));
    }

    let columns = store
        .table_columns(table)
        .map_err(|e| failed(format!("Catalog read failed: {}", e.message)))?;
    if columns.is_empty() {
        return Err(failed(format!(
            "Table {} has no columns or does not exist",
            table
        )));
    }
    Ok(columns)
}
