use crate::{ErrorCode, ErrorContext, SheetlinkError};

impl From<rusqlite::Error> for SheetlinkError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::NotADatabase
                | rusqlite::ErrorCode::PermissionDenied
                | rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked => ErrorCode::StoreUnavailable,
                rusqlite::ErrorCode::OperationInterrupted => ErrorCode::QueryTimeout,
                _ => ErrorCode::QueryFailed,
            },
            _ => ErrorCode::QueryFailed,
        };
        SheetlinkError::new(code, format!("Database error: {}", err))
    }
}

impl From<std::io::Error> for SheetlinkError {
    fn from(err: std::io::Error) -> Self {
        SheetlinkError::new(ErrorCode::InternalPanic, err.to_string())
    }
}

impl From<serde_json::Error> for SheetlinkError {
    fn from(err: serde_json::Error) -> Self {
        SheetlinkError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

impl From<config::ConfigError> for SheetlinkError {
    fn from(err: config::ConfigError) -> Self {
        let field = match &err {
            config::ConfigError::NotFound(key) => Some(key.clone()),
            config::ConfigError::Type { key, .. } => key.clone(),
            _ => None,
        };
        SheetlinkError::new(ErrorCode::ConfigUnreadable, err.to_string()).with_context(
            ErrorContext::Config {
                file_path: None,
                field,
            },
        )
    }
}

/// Closest option within edit distance 3, if any.
pub fn find_closest_match(target: &str, options: &[String]) -> Option<String> {
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(target, option);
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option.as_str());
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // Single rolling row
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let cost = if ca == cb { 0 } else { 1 };
            row[j + 1] = (above + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }
    row[b.len()]
}
