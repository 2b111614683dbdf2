//! # Error Contexts
//!
//! Structured metadata attached to errors so hosts and log readers can act on
//! them without parsing messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for SHEETLINK-1002 (FieldNotWhitelisted)
    InvalidField {
        field: String,
        table: Option<String>,
        available_fields: Vec<String>,
    },

    /// Context for SHEETLINK-1001 (InvalidInputType)
    InvalidInput {
        function: String,
        argument: String,
        expected: String,
        actual: String,
    },

    /// Context for store errors (SHEETLINK-3001, 3002, 3003)
    Store {
        path: Option<String>,
        table: Option<String>,
    },

    /// Context for SHEETLINK-4001/4002 (config errors)
    Config {
        file_path: Option<String>,
        field: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_context_tagging() {
        let ctx = ErrorContext::InvalidInput {
            function: "get_daily_data".to_string(),
            argument: "entity_id".to_string(),
            expected: "number".to_string(),
            actual: "text".to_string(),
        };

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["type"], "invalid_input");
        assert_eq!(json["argument"], "entity_id");

        let de: ErrorContext = serde_json::from_value(json).unwrap();
        assert_eq!(de, ctx);
    }
}
