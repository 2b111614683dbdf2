//! Structured exit codes for scripted callers.
//!
//! A lookup that resolves to a sentinel token still prints the token, then
//! exits with the code for its failure class.

use sheetlink_core::CallerToken;
use sheetlink_error::{ErrorCategory, Sentinel};

/// Success (standard convention)
pub const SUCCESS: i32 = 0;

/// General error (fallback for unknown errors)
pub const GENERAL_ERROR: i32 = 1;

/// CLI usage error (invalid arguments, unparseable batch line)
pub const USAGE_ERROR: i32 = 2;

/// Configuration error (invalid table name, unusable settings)
pub const CONFIG_ERROR: i32 = 3;

/// Store error (database unreachable, query failed, timeout)
pub const STORE_ERROR: i32 = 4;

/// Validation error (wrong argument type, field not whitelisted)
pub const VALIDATION_ERROR: i32 = 5;

/// The query ran but matched nothing
pub const NOT_FOUND: i32 = 6;

pub fn for_category(category: ErrorCategory) -> i32 {
    match category {
        ErrorCategory::Validation => VALIDATION_ERROR,
        ErrorCategory::NotFound => NOT_FOUND,
        ErrorCategory::Store => STORE_ERROR,
        ErrorCategory::Startup => CONFIG_ERROR,
        // Internal, and any category added later
        _ => GENERAL_ERROR,
    }
}

pub fn for_token(token: CallerToken) -> i32 {
    match token.sentinel() {
        None => SUCCESS,
        Some(Sentinel::InputError) | Some(Sentinel::InvalidField) => VALIDATION_ERROR,
        Some(Sentinel::NotAvailable) => NOT_FOUND,
        Some(Sentinel::QueryError) => STORE_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_codes() {
        assert_eq!(for_token(CallerToken::Success), SUCCESS);
        assert_eq!(for_token(CallerToken::Error(Sentinel::InvalidField)), VALIDATION_ERROR);
        assert_eq!(for_token(CallerToken::Error(Sentinel::NotAvailable)), NOT_FOUND);
        assert_eq!(for_token(CallerToken::Error(Sentinel::QueryError)), STORE_ERROR);
    }

    #[test]
    fn test_category_codes_agree_with_tokens() {
        assert_eq!(for_category(ErrorCategory::NotFound), for_token(CallerToken::Error(Sentinel::NotAvailable)));
        assert_eq!(for_category(ErrorCategory::Store), for_token(CallerToken::Error(Sentinel::QueryError)));
    }
}
