use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Short token returned to a spreadsheet in place of a value.
///
/// The host cannot receive exceptions, so every failure resolves to one of
/// these strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentinel {
    #[serde(rename = "#QUERY_ERROR")]
    QueryError,
    #[serde(rename = "#INPUT_ERROR")]
    InputError,
    #[serde(rename = "#INVALID_FIELD")]
    InvalidField,
    #[serde(rename = "#N/A_DATA")]
    NotAvailable,
}

impl Sentinel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentinel::QueryError => "#QUERY_ERROR",
            Sentinel::InputError => "#INPUT_ERROR",
            Sentinel::InvalidField => "#INVALID_FIELD",
            Sentinel::NotAvailable => "#N/A_DATA",
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentinel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "#QUERY_ERROR" => Ok(Sentinel::QueryError),
            "#INPUT_ERROR" => Ok(Sentinel::InputError),
            "#INVALID_FIELD" => Ok(Sentinel::InvalidField),
            "#N/A_DATA" => Ok(Sentinel::NotAvailable),
            other => Err(format!("not a sentinel token: {}", other)),
        }
    }
}
