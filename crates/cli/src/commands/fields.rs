use owo_colors::OwoColorize;
use serde::Serialize;
use sheetlink_core::LookupContext;

use crate::exit_codes;
use crate::output::{self, OutputFormat};

#[derive(Serialize, Debug)]
pub struct FieldsReport {
    pub table: String,
    pub source: String,
    pub fields: Vec<String>,
}

pub fn report(context: &LookupContext) -> FieldsReport {
    let whitelist = context.whitelist();
    FieldsReport {
        table: context.table_name().to_string(),
        source: whitelist.source().to_string(),
        fields: whitelist.sorted().into_iter().map(str::to_string).collect(),
    }
}

/// List the fields a lookup may ask for.
pub fn fields(context: &LookupContext, format: OutputFormat) -> anyhow::Result<i32> {
    let report = report(context);

    if format.is_machine_readable() {
        output::print_success(format, &report)?;
    } else {
        println!(
            "{} {} ({})",
            "Fields of".bold(),
            report.table.bold(),
            report.source
        );
        for field in &report.fields {
            println!("  {}", field);
        }
    }

    Ok(exit_codes::SUCCESS)
}
