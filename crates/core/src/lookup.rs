//! # Lookup Operations
//!
//! The four calls a spreadsheet can make. Each one validates its arguments,
//! gates every identifier through the whitelist, runs its fixed SQL shape
//! through the cache and logs the outcome. None of them can fail: every
//! failure resolves to a sentinel token in the returned output.
//!
//! | Operation        | Projection                                   | Filter                         |
//! |------------------|----------------------------------------------|--------------------------------|
//! | `point_lookup`   | field                                        | entity = ?, date = ?           |
//! | `entity_series`  | date, field                                  | entity = ?, date BETWEEN ? AND ? |
//! | `daily_snapshot` | entity, name, sector, category, field        | date = ?                       |
//! | `full_history`   | date, field                                  | entity = ?                     |

use std::fmt::{self, Write};
use std::time::Instant;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sheetlink_error::{ErrorCode, ErrorContext, Result, Sentinel, SheetlinkError};

use crate::call_log::CallerToken;
use crate::context::LookupContext;
use crate::sanitize::ColumnGate;
use crate::value::{CellValue, SharedResultSet, SqlValue};

pub const POINT_LOOKUP: &str = "get_daily_data";
pub const ENTITY_SERIES: &str = "get_series";
pub const DAILY_SNAPSHOT: &str = "get_daily_matrix";
pub const FULL_HISTORY: &str = "get_history";

/// Header label for the date column of series and history grids.
pub const DATE_HEADER: &str = "Date";

/// What goes back into the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupOutput {
    Value(CellValue),
    /// First row is the header.
    Grid(Vec<Vec<CellValue>>),
}

impl LookupOutput {
    fn token(sentinel: Sentinel) -> CellValue {
        CellValue::Text(sentinel.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub output: LookupOutput,
    pub token: CallerToken,
}

impl LookupResult {
    pub fn is_success(&self) -> bool {
        self.token.is_success()
    }
}

/// Rows plus the header they are presented under.
struct Tabular {
    header: Vec<String>,
    rows: SharedResultSet,
}

impl LookupContext {
    /// One value for one entity on one date.
    pub fn point_lookup(&self, entity_id: &CellValue, field: &CellValue, date: &CellValue) -> LookupResult {
        let started = Instant::now();
        let params = [entity_id.clone(), field.clone(), date.clone()];

        let outcome = self.point_rows(entity_id, field, date).and_then(|rows| {
            match rows.first_row().and_then(|row| row.first()) {
                Some(value) => Ok(CellValue::from(value)),
                None => Err(SheetlinkError::not_found()),
            }
        });

        match outcome {
            Ok(value) => {
                let token = self.logger().log_call(POINT_LOOKUP, &params, started, Ok(()));
                LookupResult {
                    output: LookupOutput::Value(value),
                    token,
                }
            }
            Err(err) => {
                let token = self.logger().log_call(POINT_LOOKUP, &params, started, Err(&err));
                let sentinel = token.sentinel().unwrap_or(Sentinel::QueryError);
                LookupResult {
                    output: LookupOutput::Value(LookupOutput::token(sentinel)),
                    token,
                }
            }
        }
    }

    /// Dated values for one entity between two dates, inclusive, oldest first.
    pub fn entity_series(
        &self,
        entity_id: &CellValue,
        field: &CellValue,
        start_date: &CellValue,
        end_date: &CellValue,
    ) -> LookupResult {
        let started = Instant::now();
        let params = [
            entity_id.clone(),
            field.clone(),
            start_date.clone(),
            end_date.clone(),
        ];
        let outcome = self.series_rows(entity_id, field, start_date, end_date);
        self.finish_grid(ENTITY_SERIES, &params, started, outcome)
    }

    /// Every entity's value of `field` on one date.
    pub fn daily_snapshot(&self, date: &CellValue, field: &CellValue) -> LookupResult {
        let started = Instant::now();
        let params = [date.clone(), field.clone()];
        let outcome = self.snapshot_rows(date, field);
        self.finish_grid(DAILY_SNAPSHOT, &params, started, outcome)
    }

    /// Every dated value of `field` for one entity, oldest first.
    pub fn full_history(&self, entity_id: &CellValue, field: &CellValue) -> LookupResult {
        let started = Instant::now();
        let params = [entity_id.clone(), field.clone()];
        let outcome = self.history_rows(entity_id, field);
        self.finish_grid(FULL_HISTORY, &params, started, outcome)
    }

    fn point_rows(&self, entity_id: &CellValue, field: &CellValue, date: &CellValue) -> Result<SharedResultSet> {
        let entity = entity_arg(POINT_LOOKUP, "entity_id", entity_id)?;
        let field = text_arg(POINT_LOOKUP, "field", field)?;
        let date = self.date_arg(POINT_LOOKUP, "date", date)?;

        let whitelist = self.whitelist();
        let gate = ColumnGate::new(&whitelist);
        let field_col = gate.column(field)?;
        let entity_col = gate.configured(&self.columns().entity_id, "COLUMNS.ENTITY_ID")?;
        let date_col = gate.configured(&self.columns().date, "COLUMNS.DATE")?;

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 AND {} = ?2",
            field_col,
            self.quoted_table(),
            entity_col,
            date_col
        );
        self.fetch(sql, vec![SqlValue::Integer(entity), SqlValue::Text(date)])
    }

    fn series_rows(
        &self,
        entity_id: &CellValue,
        field: &CellValue,
        start_date: &CellValue,
        end_date: &CellValue,
    ) -> Result<Tabular> {
        let entity = entity_arg(ENTITY_SERIES, "entity_id", entity_id)?;
        let field = text_arg(ENTITY_SERIES, "field", field)?;
        let start = self.date_arg(ENTITY_SERIES, "start_date", start_date)?;
        let end = self.date_arg(ENTITY_SERIES, "end_date", end_date)?;

        let whitelist = self.whitelist();
        let gate = ColumnGate::new(&whitelist);
        let field_col = gate.column(field)?;
        let entity_col = gate.configured(&self.columns().entity_id, "COLUMNS.ENTITY_ID")?;
        let date_col = gate.configured(&self.columns().date, "COLUMNS.DATE")?;

        let sql = format!(
            "SELECT {date}, {field} FROM {table} WHERE {entity} = ?1 AND {date} BETWEEN ?2 AND ?3 ORDER BY {date}",
            date = date_col,
            field = field_col,
            table = self.quoted_table(),
            entity = entity_col,
        );
        let rows = self.fetch(
            sql,
            vec![
                SqlValue::Integer(entity),
                SqlValue::Text(start),
                SqlValue::Text(end),
            ],
        )?;

        Ok(Tabular {
            header: vec![DATE_HEADER.to_string(), field.to_string()],
            rows,
        })
    }

    fn snapshot_rows(&self, date: &CellValue, field: &CellValue) -> Result<Tabular> {
        let date = self.date_arg(DAILY_SNAPSHOT, "date", date)?;
        let field = text_arg(DAILY_SNAPSHOT, "field", field)?;

        let columns = self.columns();
        let whitelist = self.whitelist();
        let gate = ColumnGate::new(&whitelist);
        let field_col = gate.column(field)?;
        let projection = [
            gate.configured(&columns.entity_id, "COLUMNS.ENTITY_ID")?,
            gate.configured(&columns.name, "COLUMNS.NAME")?,
            gate.configured(&columns.sector, "COLUMNS.SECTOR")?,
            gate.configured(&columns.category, "COLUMNS.CATEGORY")?,
            field_col,
        ];
        let date_col = gate.configured(&columns.date, "COLUMNS.DATE")?;

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            projection.join(", "),
            self.quoted_table(),
            date_col
        );
        let rows = self.fetch(sql, vec![SqlValue::Text(date)])?;

        Ok(Tabular {
            header: vec![
                columns.entity_id.clone(),
                columns.name.clone(),
                columns.sector.clone(),
                columns.category.clone(),
                field.to_string(),
            ],
            rows,
        })
    }

    fn history_rows(&self, entity_id: &CellValue, field: &CellValue) -> Result<Tabular> {
        let entity = entity_arg(FULL_HISTORY, "entity_id", entity_id)?;
        let field = text_arg(FULL_HISTORY, "field", field)?;

        let whitelist = self.whitelist();
        let gate = ColumnGate::new(&whitelist);
        let field_col = gate.column(field)?;
        let entity_col = gate.configured(&self.columns().entity_id, "COLUMNS.ENTITY_ID")?;
        let date_col = gate.configured(&self.columns().date, "COLUMNS.DATE")?;

        let sql = format!(
            "SELECT {date}, {field} FROM {table} WHERE {entity} = ?1 ORDER BY {date}",
            date = date_col,
            field = field_col,
            table = self.quoted_table(),
            entity = entity_col,
        );
        let rows = self.fetch(sql, vec![SqlValue::Integer(entity)])?;

        Ok(Tabular {
            header: vec![DATE_HEADER.to_string(), field.to_string()],
            rows,
        })
    }

    fn finish_grid(
        &self,
        func_name: &str,
        params: &[CellValue],
        started: Instant,
        outcome: Result<Tabular>,
    ) -> LookupResult {
        let logger = self.logger();
        match outcome {
            Ok(tabular) if tabular.rows.is_empty() => {
                let err = SheetlinkError::not_found();
                let token = logger.log_call(func_name, params, started, Err(&err));

                let mut placeholder = vec![CellValue::from(""); tabular.header.len()];
                placeholder[0] = LookupOutput::token(Sentinel::NotAvailable);
                let header: Vec<CellValue> = tabular.header.into_iter().map(CellValue::Text).collect();

                LookupResult {
                    output: LookupOutput::Grid(vec![header, placeholder]),
                    token,
                }
            }
            Ok(tabular) => {
                let token = logger.log_call(func_name, params, started, Ok(()));

                let mut grid: Vec<Vec<CellValue>> = Vec::with_capacity(tabular.rows.len() + 1);
                grid.push(tabular.header.into_iter().map(CellValue::Text).collect());
                grid.extend(
                    tabular
                        .rows
                        .rows()
                        .iter()
                        .map(|row| row.iter().map(CellValue::from).collect()),
                );

                LookupResult {
                    output: LookupOutput::Grid(grid),
                    token,
                }
            }
            Err(err) => {
                let token = logger.log_call(func_name, params, started, Err(&err));
                let sentinel = token.sentinel().unwrap_or(Sentinel::QueryError);
                LookupResult {
                    output: LookupOutput::Grid(vec![vec![LookupOutput::token(sentinel)]]),
                    token,
                }
            }
        }
    }

    /// Parse `value` with the configured format and render it back, so that
    /// `2024-1-2` binds as the stored `2024-01-02`.
    fn date_arg(&self, function: &str, argument: &str, value: &CellValue) -> Result<String> {
        let text = text_arg(function, argument, value)?;
        let format = self.date_format();

        let normalized = NaiveDateTime::parse_from_str(text, format)
            .ok()
            .and_then(|dt| render(dt.format(format)))
            .or_else(|| {
                NaiveDate::parse_from_str(text, format)
                    .ok()
                    .and_then(|d| render(d.format(format)))
            });

        normalized.ok_or_else(|| {
            SheetlinkError::new(
                ErrorCode::InvalidInputType,
                format!("Invalid date: {} (expected format {})", text, format),
            )
            .with_context(ErrorContext::InvalidInput {
                function: function.to_string(),
                argument: argument.to_string(),
                expected: format!("date in {}", format),
                actual: text.to_string(),
            })
        })
    }
}

/// `None` when the format asks for something the value does not carry.
fn render(formatted: impl fmt::Display) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", formatted).ok()?;
    Some(out)
}

fn invalid_input(function: &str, argument: &str, expected: &str, value: &CellValue) -> SheetlinkError {
    SheetlinkError::new(ErrorCode::InvalidInputType, "Invalid input type.").with_context(
        ErrorContext::InvalidInput {
            function: function.to_string(),
            argument: argument.to_string(),
            expected: expected.to_string(),
            actual: value.type_name().to_string(),
        },
    )
}

/// Entity ids arrive as spreadsheet numbers; only whole values are ids.
fn entity_arg(function: &str, argument: &str, value: &CellValue) -> Result<i64> {
    match value {
        CellValue::Integer(id) => Ok(*id),
        CellValue::Number(n)
            if n.is_finite() && n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 =>
        {
            Ok(*n as i64)
        }
        other => Err(invalid_input(function, argument, "whole number", other)),
    }
}

fn text_arg<'a>(function: &str, argument: &str, value: &'a CellValue) -> Result<&'a str> {
    value
        .as_text()
        .ok_or_else(|| invalid_input(function, argument, "text", value))
}
