//! Many lookups against one context, one per input line:
//!
//! ```text
//! point 1001 price 2024-01-02
//! series 1001 price 2024-01-01 2024-01-31
//! # comments and blank lines are skipped
//! reload
//! ```
//!
//! Repeated lookups are answered from the shared cache; cache statistics are
//! reported at the end.

use std::io::BufRead;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use serde::Serialize;
use sheetlink_core::{CacheStats, CallerToken, LookupContext, LookupOutput};

use super::lookup::LookupCommand;
use crate::exit_codes;
use crate::output::{self, CommandResponse, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "batch", no_binary_name = true)]
struct BatchLine {
    #[command(subcommand)]
    command: BatchCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BatchCommand {
    #[command(flatten)]
    Lookup(LookupCommand),
    /// Re-read the field whitelist and clear the cache
    Reload,
}

/// Parse one input line; `Ok(None)` for blanks and comments.
pub fn parse_line(line: &str) -> Result<Option<BatchCommand>, clap::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    BatchLine::try_parse_from(line.split_whitespace()).map(|parsed| Some(parsed.command))
}

#[derive(Serialize, Debug)]
pub struct BatchEntry {
    pub line: usize,
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<CallerToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<LookupOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct BatchSummary {
    pub lookups: usize,
    pub failed: usize,
    pub cache: CacheStats,
    pub entries: Vec<BatchEntry>,
}

/// Run every line of `input`, returning the summary and the exit code of the
/// first failure (or success).
pub fn run_batch(context: &LookupContext, input: impl BufRead) -> anyhow::Result<(BatchSummary, i32)> {
    let mut entries = Vec::new();
    let mut lookups = 0;
    let mut failed = 0;
    let mut exit_code = exit_codes::SUCCESS;

    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                failed += 1;
                if exit_code == exit_codes::SUCCESS {
                    exit_code = exit_codes::USAGE_ERROR;
                }
                entries.push(BatchEntry {
                    line: line_no,
                    function: "parse".to_string(),
                    token: None,
                    result: None,
                    error: Some(first_line(&e.to_string())),
                });
                continue;
            }
        };

        match command {
            BatchCommand::Reload => {
                let whitelist = context.reload_whitelist();
                tracing::info!(
                    line = line_no,
                    fields = whitelist.len(),
                    source = %whitelist.source(),
                    "Whitelist reloaded"
                );
                entries.push(BatchEntry {
                    line: line_no,
                    function: "reload".to_string(),
                    token: Some(CallerToken::Success),
                    result: None,
                    error: None,
                });
            }
            BatchCommand::Lookup(lookup) => {
                lookups += 1;
                let result = lookup.execute(context);
                if !result.is_success() {
                    failed += 1;
                    if exit_code == exit_codes::SUCCESS {
                        exit_code = exit_codes::for_token(result.token);
                    }
                }
                entries.push(BatchEntry {
                    line: line_no,
                    function: lookup.function_name().to_string(),
                    token: Some(result.token),
                    result: Some(result.output),
                    error: None,
                });
            }
        }
    }

    let summary = BatchSummary {
        lookups,
        failed,
        cache: context.cache_stats(),
        entries,
    };
    Ok((summary, exit_code))
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().trim().to_string()
}

pub fn batch(context: &LookupContext, input: impl BufRead, format: OutputFormat) -> anyhow::Result<i32> {
    let (summary, exit_code) = run_batch(context, input)?;

    if format.is_machine_readable() {
        if exit_code == exit_codes::SUCCESS {
            output::print_success(format, &summary)?;
        } else {
            let message = format!("{} of {} lines failed", summary.failed, summary.entries.len());
            output::print_output(format, CommandResponse::error(message, exit_code, &summary))?;
        }
        return Ok(exit_code);
    }

    for entry in &summary.entries {
        println!("{}", format!("[{}] {}", entry.line, entry.function).dimmed());
        if let Some(error) = &entry.error {
            eprintln!("{} line {}: {}", "Error:".red().bold(), entry.line, error);
        }
        if let Some(result) = &entry.result {
            output::print_lookup(result);
        }
    }

    let cache = &summary.cache;
    println!(
        "{} {} lookups, {} failed; cache {}/{} entries, {} hits, {} misses",
        "Done:".green().bold(),
        summary.lookups,
        summary.failed,
        cache.entry_count,
        cache.capacity,
        cache.hits,
        cache.misses
    );

    Ok(exit_code)
}
