//! # Call Logger
//!
//! Every lookup ends here, success or failure. The logger times the call,
//! writes one line to the durable sink and hands back the token the caller
//! surfaces to the spreadsheet.
//!
//! Line format:
//!
//! ```text
//! 2024-01-02 09:30:00,123 | INFO | get_daily_data | P: (1001, price, 2024-01-02) | Time: 0.42ms | Status: SUCCESS
//! 2024-01-02 09:30:00,456 | ERROR | get_daily_data | P: (1001, revenue, 2024-01-02) | Time: 0.03ms | Status: FAILURE | Error: Invalid field: revenue
//! ```
//!
//! Logging never fails the caller. A sink that cannot be opened is replaced
//! by [`ConsoleSink`]; a write error is reported on stderr and dropped.

mod sink;

pub use sink::{ConsoleSink, LogSink, RotatingFileSink};

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use sheetlink_common::config::LoggingSettings;
use sheetlink_error::{ErrorCode, ErrorContext, Sentinel, SheetlinkError};
use tracing::{error, info, warn};

use crate::value::CellValue;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Failure,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "SUCCESS",
            CallStatus::Failure => "FAILURE",
        }
    }

    fn level(&self) -> &'static str {
        match self {
            CallStatus::Success => "INFO",
            CallStatus::Failure => "ERROR",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller gets back from the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerToken {
    Success,
    Error(Sentinel),
}

impl CallerToken {
    pub fn is_success(&self) -> bool {
        matches!(self, CallerToken::Success)
    }

    pub fn sentinel(&self) -> Option<Sentinel> {
        match self {
            CallerToken::Success => None,
            CallerToken::Error(sentinel) => Some(*sentinel),
        }
    }
}

impl fmt::Display for CallerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerToken::Success => f.write_str(CallStatus::Success.as_str()),
            CallerToken::Error(sentinel) => f.write_str(sentinel.as_str()),
        }
    }
}

impl Serialize for CallerToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One call, formatted and dropped immediately.
#[derive(Debug, Clone)]
pub struct CallRecord<'a> {
    pub func_name: &'a str,
    pub params: &'a [CellValue],
    pub elapsed: Duration,
    pub status: CallStatus,
    pub error: Option<&'a str>,
    pub timestamp: DateTime<Local>,
}

impl CallRecord<'_> {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// The record without timestamp and level.
    pub fn message(&self) -> String {
        let params = self
            .params
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        let mut message = format!(
            "{} | P: ({}) | Time: {:.2}ms | Status: {}",
            self.func_name,
            params,
            self.elapsed_ms(),
            self.status
        );
        if let Some(error) = self.error {
            message.push_str(" | Error: ");
            message.push_str(error);
        }
        message
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} | {} | {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.status.level(),
            self.message()
        )
    }
}

pub struct CallLogger {
    sink: Box<dyn LogSink>,
}

impl fmt::Debug for CallLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLogger")
            .field("sink", &self.sink.describe())
            .finish()
    }
}

impl CallLogger {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    pub fn console() -> Self {
        Self::new(ConsoleSink)
    }

    /// Open the configured rotating file, or fall back to stderr.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        match open_file_sink(settings) {
            Ok(sink) => Self::new(sink),
            Err(e) => {
                warn!(
                    target: "startup",
                    code = %e.code,
                    error = %e.message,
                    "Could not open call log; logging calls to stderr"
                );
                Self::console()
            }
        }
    }

    pub fn describe(&self) -> String {
        self.sink.describe()
    }

    /// Record a finished call and return the caller token for its outcome.
    pub fn log_call(
        &self,
        func_name: &str,
        params: &[CellValue],
        started: Instant,
        outcome: Result<(), &SheetlinkError>,
    ) -> CallerToken {
        let elapsed = started.elapsed();
        let (status, error_text, token) = match outcome {
            Ok(()) => (CallStatus::Success, None, CallerToken::Success),
            Err(err) => (
                CallStatus::Failure,
                Some(err.message.as_str()),
                CallerToken::Error(err.sentinel()),
            ),
        };

        let record = CallRecord {
            func_name,
            params,
            elapsed,
            status,
            error: error_text,
            timestamp: Local::now(),
        };
        self.write(&record);

        match outcome {
            Ok(()) => info!(
                target: "calls",
                func = func_name,
                elapsed_ms = record.elapsed_ms(),
                "SUCCESS"
            ),
            Err(err) => error!(
                target: "calls",
                func = func_name,
                elapsed_ms = record.elapsed_ms(),
                code = %err.code,
                error = %err.message,
                "FAILURE"
            ),
        }

        token
    }

    fn write(&self, record: &CallRecord<'_>) {
        let line = record.to_line();
        if let Err(e) = self.sink.write_line(&line) {
            eprintln!("call log write to {} failed: {}", self.sink.describe(), e);
            eprintln!("{}", line);
        }
    }
}

fn open_file_sink(settings: &LoggingSettings) -> sheetlink_error::Result<RotatingFileSink> {
    RotatingFileSink::open(&settings.log_file, settings.max_bytes, settings.backup_count).map_err(|e| {
        SheetlinkError::new(
            ErrorCode::LogSinkUnavailable,
            format!("Could not open {}: {}", settings.log_file, e),
        )
        .with_context(ErrorContext::Config {
            file_path: Some(settings.log_file.clone()),
            field: Some("LOGGING.LOG_FILE".to_string()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemorySink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl LogSink for MemorySink {
        fn write_line(&self, line: &str) -> io::Result<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    struct BrokenSink;

    impl LogSink for BrokenSink {
        fn write_line(&self, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    fn params() -> Vec<CellValue> {
        vec![
            CellValue::Integer(1001),
            CellValue::from("price"),
            CellValue::from("2024-01-02"),
        ]
    }

    #[test]
    fn test_success_line_format() {
        let sink = MemorySink::default();
        let logger = CallLogger::new(sink.clone());

        let token = logger.log_call("get_daily_data", &params(), Instant::now(), Ok(()));
        assert_eq!(token, CallerToken::Success);

        let lines = sink.lines.lock().unwrap();
        let parts: Vec<&str> = lines[0].split(" | ").collect();
        assert_eq!(parts.len(), 6);
        // 2024-01-02 09:30:00,123
        assert_eq!(parts[0].len(), 23);
        assert_eq!(&parts[0][19..20], ",");
        assert_eq!(parts[1], "INFO");
        assert_eq!(parts[2], "get_daily_data");
        assert_eq!(parts[3], "P: (1001, price, 2024-01-02)");
        assert!(parts[4].starts_with("Time: ") && parts[4].ends_with("ms"));
        assert_eq!(parts[5], "Status: SUCCESS");
    }

    #[test]
    fn test_failure_line_carries_error_and_sentinel() {
        let sink = MemorySink::default();
        let logger = CallLogger::new(sink.clone());
        let err = SheetlinkError::field_not_whitelisted("revenue", ["price", "date"]);

        let token = logger.log_call("get_daily_data", &params(), Instant::now(), Err(&err));
        assert_eq!(token, CallerToken::Error(Sentinel::InvalidField));
        assert_eq!(token.to_string(), "#INVALID_FIELD");

        let lines = sink.lines.lock().unwrap();
        assert!(lines[0].contains(" | ERROR | get_daily_data | "));
        assert!(lines[0].ends_with("| Status: FAILURE | Error: Invalid field: revenue"));
    }

    #[test]
    fn test_elapsed_has_two_decimals() {
        let record = CallRecord {
            func_name: "get_series",
            params: &[],
            elapsed: Duration::from_micros(1_234_567),
            status: CallStatus::Success,
            error: None,
            timestamp: Local::now(),
        };
        assert_eq!(
            record.message(),
            "get_series | P: () | Time: 1234.57ms | Status: SUCCESS"
        );
    }

    #[test]
    fn test_broken_sink_never_fails_caller() {
        let logger = CallLogger::new(BrokenSink);
        let err = SheetlinkError::new(ErrorCode::QueryFailed, "Database error: no such column");
        let token = logger.log_call("get_history", &params(), Instant::now(), Err(&err));
        assert_eq!(token, CallerToken::Error(Sentinel::QueryError));
    }

    #[test]
    fn test_unopenable_log_file_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LoggingSettings {
            log_file: dir
                .path()
                .join("missing")
                .join("query_log.txt")
                .display()
                .to_string(),
            ..LoggingSettings::default()
        };

        let err = open_file_sink(&settings).unwrap_err();
        assert_eq!(err.code, ErrorCode::LogSinkUnavailable);

        let logger = CallLogger::from_settings(&settings);
        assert_eq!(logger.describe(), "stderr");
        assert!(logger
            .log_call("get_daily_data", &params(), Instant::now(), Ok(()))
            .is_success());
    }

    #[test]
    fn test_token_serializes_as_string() {
        let json = serde_json::to_string(&CallerToken::Error(Sentinel::NotAvailable)).unwrap();
        assert_eq!(json, "\"#N/A_DATA\"");
    }
}
