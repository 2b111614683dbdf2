//! Sheetlink Core: validated, cached, logged read-only lookups for a
//! spreadsheet front end.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Lookup operation │  validate → whitelist gate → format → log
//! └────────┬─────────┘
//!          │
//!   ┌──────┴──────┐
//!   │ Query cache │  LRU keyed by (SQL text, params)
//!   └──────┬──────┘
//!          │ miss
//!   ┌──────┴──────┐
//!   │  Executor   │  connection per call, bound params
//!   └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sheetlink_common::config::AppConfig;
//! use sheetlink_core::{CellValue, LookupContext};
//!
//! let config = AppConfig::load("config.ini");
//! let context = LookupContext::from_config(&config)?;
//! let result = context.point_lookup(
//!     &CellValue::Integer(1001),
//!     &CellValue::from("price"),
//!     &CellValue::from("2024-01-02"),
//! );
//! println!("{:?} ({})", result.output, result.token);
//! # Ok::<(), sheetlink_error::SheetlinkError>(())
//! ```

pub mod cache;
pub mod call_log;
pub mod context;
pub mod executor;
pub mod lookup;
pub mod sanitize;
pub mod schema;
pub mod value;

pub use cache::{CacheConfig, CacheStats, QueryCache};
pub use call_log::{CallLogger, CallerToken, LogSink};
pub use context::{LookupContext, LookupContextBuilder};
pub use executor::{QueryStore, SqliteStore};
pub use lookup::{LookupOutput, LookupResult};
pub use schema::{build_whitelist, FieldWhitelist, WhitelistSource};
pub use value::{CellValue, QueryKey, ResultSet, SqlValue};
