use clap::Subcommand;
use serde::Serialize;
use sheetlink_core::lookup::{DAILY_SNAPSHOT, ENTITY_SERIES, FULL_HISTORY, POINT_LOOKUP};
use sheetlink_core::{CallerToken, CellValue, LookupContext, LookupOutput, LookupResult};

use crate::exit_codes;
use crate::output::{self, CommandResponse, OutputFormat};

/// The four lookups, with arguments typed like spreadsheet cells.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum LookupCommand {
    /// Value of FIELD for ENTITY on DATE
    Point {
        entity: String,
        field: String,
        date: String,
    },
    /// Dated values of FIELD for ENTITY between START and END (inclusive)
    Series {
        entity: String,
        field: String,
        start: String,
        end: String,
    },
    /// Every entity's value of FIELD on DATE
    Snapshot { date: String, field: String },
    /// Every dated value of FIELD for ENTITY
    History { entity: String, field: String },
}

impl LookupCommand {
    pub fn function_name(&self) -> &'static str {
        match self {
            LookupCommand::Point { .. } => POINT_LOOKUP,
            LookupCommand::Series { .. } => ENTITY_SERIES,
            LookupCommand::Snapshot { .. } => DAILY_SNAPSHOT,
            LookupCommand::History { .. } => FULL_HISTORY,
        }
    }

    pub fn execute(&self, context: &LookupContext) -> LookupResult {
        match self {
            LookupCommand::Point {
                entity,
                field,
                date,
            } => context.point_lookup(
                &CellValue::from_arg(entity),
                &CellValue::from_arg(field),
                &CellValue::from_arg(date),
            ),
            LookupCommand::Series {
                entity,
                field,
                start,
                end,
            } => context.entity_series(
                &CellValue::from_arg(entity),
                &CellValue::from_arg(field),
                &CellValue::from_arg(start),
                &CellValue::from_arg(end),
            ),
            LookupCommand::Snapshot { date, field } => {
                context.daily_snapshot(&CellValue::from_arg(date), &CellValue::from_arg(field))
            }
            LookupCommand::History { entity, field } => {
                context.full_history(&CellValue::from_arg(entity), &CellValue::from_arg(field))
            }
        }
    }
}

#[derive(Serialize)]
pub struct LookupReport<'a> {
    pub function: &'static str,
    pub token: CallerToken,
    pub result: &'a LookupOutput,
}

/// Run one lookup, print it, and return its exit code.
pub fn lookup(context: &LookupContext, command: &LookupCommand, format: OutputFormat) -> anyhow::Result<i32> {
    let result = command.execute(context);
    let exit_code = exit_codes::for_token(result.token);

    if format.is_machine_readable() {
        let report = LookupReport {
            function: command.function_name(),
            token: result.token,
            result: &result.output,
        };
        if result.is_success() {
            output::print_success(format, report)?;
        } else {
            output::print_output(
                format,
                CommandResponse::error(result.token.to_string(), exit_code, report),
            )?;
        }
    } else {
        output::print_lookup(&result.output);
    }

    Ok(exit_code)
}
