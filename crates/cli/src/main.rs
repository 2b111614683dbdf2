//! Sheetlink CLI: spreadsheet lookups from the command line.
//!
//! Each invocation builds one lookup context from `config.ini` (or `--config`)
//! and answers the same four calls a spreadsheet makes, logging them to the
//! same rotating call log.
//!
//! # Commands
//!
//! - `point`, `series`, `snapshot`, `history`: the lookups.
//! - `fields`: the field whitelist and where it came from.
//! - `batch`: one lookup per stdin line against a shared cache.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use owo_colors::OwoColorize;

mod commands;
mod exit_codes;
mod output;

use commands::LookupCommand;
use output::OutputFormat;
use sheetlink_common::config::{AppConfig, DEFAULT_CONFIG_PATH};
use sheetlink_common::telemetry;
use sheetlink_core::LookupContext;

/// Per-call events already go to the call log; keep stderr for warnings.
const CLI_LOG_DIRECTIVE: &str = "warn,calls=off";

#[derive(Parser)]
#[command(name = "sheetlink")]
#[command(about = "Validated, cached metric lookups for spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human, json, yaml)
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Path to the configuration file
    #[arg(long, global = true, env = "SHEETLINK_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Lookup(LookupCommand),
    /// List the fields lookups may request
    Fields,
    /// Run lookups read from stdin, one per line, sharing one cache
    Batch,
}

fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let cli = Cli::parse();
    telemetry::init_tracing(CLI_LOG_DIRECTIVE);

    match run_cli(&cli) {
        Ok(exit_code) => {
            if exit_code != exit_codes::SUCCESS {
                std::process::exit(exit_code);
            }
        }
        Err(e) => {
            let exit_code = map_error_to_exit_code(&e);
            if cli.output.is_machine_readable() {
                output::print_error::<()>(cli.output, &e.to_string(), exit_code).ok();
            } else {
                eprintln!("{} {}", "Error:".red().bold(), e);
            }
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn map_error_to_exit_code(e: &anyhow::Error) -> i32 {
    if let Some(err) = e.downcast_ref::<sheetlink_error::SheetlinkError>() {
        return exit_codes::for_category(err.category());
    }
    exit_codes::GENERAL_ERROR
}

fn run_cli(cli: &Cli) -> Result<i32, anyhow::Error> {
    let config = AppConfig::load(&cli.config);
    let context = LookupContext::from_config(&config)?;

    match &cli.command {
        Commands::Lookup(command) => commands::lookup(&context, command, cli.output),
        Commands::Fields => commands::fields(&context, cli.output),
        Commands::Batch => {
            let stdin = std::io::stdin();
            commands::batch(&context, stdin.lock(), cli.output)
        }
    }
}
