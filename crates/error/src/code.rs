use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Sentinel;

/// Numeric error codes following SHEETLINK-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Input validation errors (never reach the store)
/// - **2000-2999**: Query ran but produced no data
/// - **3000-3999**: Store errors (connectivity, SQL, driver)
/// - **4000-4999**: Startup errors (config, introspection, log sink)
/// - **5000-5999**: Internal/System errors
///
/// Codes are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Validation Errors (1000-1999) ===
    /// SHEETLINK-1001: Argument has the wrong cell type
    InvalidInputType = 1001,
    /// SHEETLINK-1002: Field is not in the whitelist
    FieldNotWhitelisted = 1002,
    /// SHEETLINK-1003: Identifier contains forbidden characters
    InvalidIdentifier = 1003,

    // === Not Found (2000-2999) ===
    /// SHEETLINK-2001: Query returned zero rows
    DataNotFound = 2001,

    // === Store Errors (3000-3999) ===
    /// SHEETLINK-3001: Database could not be opened
    StoreUnavailable = 3001,
    /// SHEETLINK-3002: Statement failed to prepare or execute
    QueryFailed = 3002,
    /// SHEETLINK-3003: Statement exceeded the query deadline
    QueryTimeout = 3003,

    // === Startup Errors (4000-4999) ===
    /// SHEETLINK-4001: Config file could not be read or parsed
    ConfigUnreadable = 4001,
    /// SHEETLINK-4002: Config values failed validation
    ConfigInvalid = 4002,
    /// SHEETLINK-4003: Table columns could not be introspected
    SchemaIntrospectionFailed = 4003,
    /// SHEETLINK-4004: Call log file could not be opened
    LogSinkUnavailable = 4004,

    // === Internal Errors (5000-5999) ===
    /// SHEETLINK-5002: Serialization/deserialization failed
    SerializationFailed = 5002,
    /// SHEETLINK-5003: Unexpected internal state
    InternalPanic = 5003,

    /// SHEETLINK-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "SHEETLINK-1002")
    pub fn as_str(&self) -> String {
        format!("SHEETLINK-{:04}", self.as_u16())
    }

    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Validation,
            2000..=2999 => ErrorCategory::NotFound,
            3000..=3999 => ErrorCategory::Store,
            4000..=4999 => ErrorCategory::Startup,
            _ => ErrorCategory::Internal,
        }
    }

    /// The token a spreadsheet caller sees in place of a value.
    pub fn sentinel(&self) -> Sentinel {
        match self {
            ErrorCode::FieldNotWhitelisted => Sentinel::InvalidField,
            ErrorCode::DataNotFound => Sentinel::NotAvailable,
            code if code.category() == ErrorCategory::Validation => Sentinel::InputError,
            _ => Sentinel::QueryError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("SHEETLINK-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::InvalidInputType),
            1002 => Ok(Self::FieldNotWhitelisted),
            1003 => Ok(Self::InvalidIdentifier),
            2001 => Ok(Self::DataNotFound),
            3001 => Ok(Self::StoreUnavailable),
            3002 => Ok(Self::QueryFailed),
            3003 => Ok(Self::QueryTimeout),
            4001 => Ok(Self::ConfigUnreadable),
            4002 => Ok(Self::ConfigInvalid),
            4003 => Ok(Self::SchemaIntrospectionFailed),
            4004 => Ok(Self::LogSinkUnavailable),
            5002 => Ok(Self::SerializationFailed),
            5003 => Ok(Self::InternalPanic),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category, used for exit codes and caller tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Store,
    Startup,
    Internal,
}
