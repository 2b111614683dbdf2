//! # sheetlink-error
//!
//! Unified error types for the sheetlink lookup layer.
//!
//! Every failure carries:
//! - A stable numeric code (SHEETLINK-XXXX)
//! - Optional structured context
//! - Optional hint for the person at the spreadsheet
//!
//! and maps onto exactly one caller-visible [`Sentinel`] token.

mod code;
mod context;
mod convert;
mod sentinel;

pub use code::{ErrorCategory, ErrorCode};
pub use context::ErrorContext;
pub use convert::find_closest_match;
pub use sentinel::Sentinel;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified error type for all sheetlink operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetlinkError {
    /// Numeric error code (e.g., "SHEETLINK-1002")
    pub code: ErrorCode,

    /// Human-readable error message, written verbatim into the call log
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl SheetlinkError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Query executed fine but matched nothing.
    pub fn not_found() -> Self {
        Self::new(ErrorCode::DataNotFound, "Data not found.")
    }

    /// A field outside the whitelist, with a suggestion when one is close.
    pub fn field_not_whitelisted<'a>(
        field: &str,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut available: Vec<String> = available.into_iter().map(str::to_string).collect();
        available.sort();

        let hint = find_closest_match(field, &available);
        let mut error = Self::new(
            ErrorCode::FieldNotWhitelisted,
            format!("Invalid field: {}", field),
        )
        .with_context(ErrorContext::InvalidField {
            field: field.to_string(),
            table: None,
            available_fields: available,
        });

        if let Some(closest) = hint {
            error = error.with_hint(format!("Did you mean '{}'?", closest));
        }
        error
    }

    pub fn sentinel(&self) -> Sentinel {
        self.code.sentinel()
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Serialize to JSON for machine-readable output
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize SheetlinkError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }
}

impl fmt::Display for SheetlinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for SheetlinkError {}

pub type Result<T> = std::result::Result<T, SheetlinkError>;
