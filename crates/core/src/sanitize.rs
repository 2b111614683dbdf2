//! Identifier gate for SQL text.
//!
//! Values are always bound. The only things ever spliced into SQL text are
//! identifiers, and they pass through here first.

use crate::schema::FieldWhitelist;
use sheetlink_error::{ErrorCode, ErrorContext, SheetlinkError};

pub const MAX_IDENTIFIER_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("empty identifier")]
    Empty,
    #[error("identifier too long: {0} characters")]
    TooLong(usize),
    #[error("forbidden characters in identifier: {0}")]
    ForbiddenCharacters(String),
}

impl From<IdentifierError> for SheetlinkError {
    fn from(err: IdentifierError) -> Self {
        SheetlinkError::new(ErrorCode::InvalidIdentifier, err.to_string())
    }
}

pub fn validate_identifier(name: &str) -> Result<(), IdentifierError> {
    if name.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if name.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong(name.chars().count()));
    }
    if name
        .chars()
        .any(|c| matches!(c, '"' | '\0' | ';' | '`' | '\\'))
    {
        return Err(IdentifierError::ForbiddenCharacters(name.to_string()));
    }
    Ok(())
}

/// Validate and double-quote an identifier.
pub fn quote_ident(name: &str) -> Result<String, IdentifierError> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name))
}

/// Column quoting bound to a whitelist: any identifier not in the whitelist
/// is refused before SQL text is built.
#[derive(Debug, Clone, Copy)]
pub struct ColumnGate<'a> {
    whitelist: &'a FieldWhitelist,
}

impl<'a> ColumnGate<'a> {
    pub fn new(whitelist: &'a FieldWhitelist) -> Self {
        Self { whitelist }
    }

    pub fn column(&self, name: &str) -> Result<String, SheetlinkError> {
        if !self.whitelist.contains(name) {
            return Err(SheetlinkError::field_not_whitelisted(
                name,
                self.whitelist.iter(),
            ));
        }
        Ok(quote_ident(name)?)
    }

    /// A column named by configuration rather than by the caller. Missing
    /// from the whitelist is a deployment problem, not a bad request.
    pub fn configured(&self, name: &str, setting: &str) -> Result<String, SheetlinkError> {
        if !self.whitelist.contains(name) {
            return Err(SheetlinkError::new(
                ErrorCode::ConfigInvalid,
                format!("Configured column {} = '{}' is not a field of the table", setting, name),
            )
            .with_context(ErrorContext::Config {
                file_path: None,
                field: Some(setting.to_string()),
            }));
        }
        Ok(quote_ident(name)?)
    }
}
