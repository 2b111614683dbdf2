use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sheetlink_common::config::{AppConfig, ColumnSettings};
use sheetlink_core::{
    CallerToken, CellValue, FieldWhitelist, LookupContext, LookupOutput, SqliteStore, WhitelistSource,
};
use sheetlink_error::Sentinel;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    config: AppConfig,
}

impl Fixture {
    fn log_contents(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("query_log.txt")).unwrap_or_default()
    }
}

fn fixture() -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("metrics.db");

    {
        let conn = rusqlite::Connection::open(&db_path)?;
        conn.execute_batch(
            "CREATE TABLE metrics (
                entityId INTEGER,
                companyName TEXT,
                sector TEXT,
                category TEXT,
                date TEXT,
                price REAL
            );",
        )?;
        let rows: [(i64, &str, &str, &str, &str, f64); 4] = [
            (1001, "Acme", "Tech", "Large", "2024-01-02", 87.5),
            (1001, "Acme", "Tech", "Large", "2024-01-04", 88.25),
            (1002, "Globex", "Energy", "Mid", "2024-01-02", 12.0),
            (1001, "Acme", "Tech", "Large", "2024-02-01", 90.0),
        ];
        for row in rows {
            conn.execute(
                "INSERT INTO metrics VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![row.0, row.1, row.2, row.3, row.4, row.5],
            )?;
        }
    }

    let mut config = AppConfig::default();
    config.database.db_path = db_path.display().to_string();
    config.logging.log_file = dir.path().join("query_log.txt").display().to_string();

    Ok(Fixture { dir, config })
}

fn text(s: &str) -> CellValue {
    CellValue::from(s)
}

#[test]
fn test_point_lookup_scenario() -> Result<()> {
    let fx = fixture()?;
    let context = LookupContext::from_config(&fx.config)?;
    assert_eq!(context.whitelist().source(), WhitelistSource::Introspected);

    let hit = context.point_lookup(&CellValue::Integer(1001), &text("price"), &text("2024-01-02"));
    assert_eq!(hit.output, LookupOutput::Value(CellValue::Number(87.5)));
    assert_eq!(hit.token, CallerToken::Success);

    let missing = context.point_lookup(&CellValue::Integer(1001), &text("price"), &text("2024-01-03"));
    assert_eq!(missing.output, LookupOutput::Value(text("#N/A_DATA")));
    assert_eq!(missing.token, CallerToken::Error(Sentinel::NotAvailable));

    let invalid = context.point_lookup(&CellValue::Integer(1001), &text("revenue"), &text("2024-01-02"));
    assert_eq!(invalid.output, LookupOutput::Value(text("#INVALID_FIELD")));

    let log = fx.log_contents();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains(" | INFO | get_daily_data | P: (1001, price, 2024-01-02) | Time: "));
    assert!(lines[0].ends_with("| Status: SUCCESS"));
    assert!(lines[1].ends_with("| Status: FAILURE | Error: Data not found."));
    assert!(lines[2].contains(" | ERROR | "));
    assert!(lines[2].ends_with("| Error: Invalid field: revenue"));
    Ok(())
}

#[test]
fn test_entity_series_scenario() -> Result<()> {
    let fx = fixture()?;
    let context = LookupContext::from_config(&fx.config)?;

    let result = context.entity_series(
        &CellValue::Integer(1001),
        &text("price"),
        &text("2024-01-01"),
        &text("2024-01-31"),
    );

    assert!(result.is_success());
    assert_eq!(
        result.output,
        LookupOutput::Grid(vec![
            vec![text("Date"), text("price")],
            vec![text("2024-01-02"), CellValue::Number(87.5)],
            vec![text("2024-01-04"), CellValue::Number(88.25)],
        ])
    );
    Ok(())
}

#[test]
fn test_series_not_found_keeps_header() -> Result<()> {
    let fx = fixture()?;
    let context = LookupContext::from_config(&fx.config)?;

    let result = context.entity_series(
        &CellValue::Number(1001.0),
        &text("price"),
        &text("2023-01-01"),
        &text("2023-12-31"),
    );

    assert_eq!(result.token, CallerToken::Error(Sentinel::NotAvailable));
    assert_eq!(
        result.output,
        LookupOutput::Grid(vec![
            vec![text("Date"), text("price")],
            vec![text("#N/A_DATA"), text("")],
        ])
    );
    Ok(())
}

#[test]
fn test_daily_snapshot() -> Result<()> {
    let fx = fixture()?;
    let context = LookupContext::from_config(&fx.config)?;

    let result = context.daily_snapshot(&text("2024-01-02"), &text("price"));
    let LookupOutput::Grid(grid) = result.output else {
        panic!("snapshot must return a grid");
    };

    assert_eq!(
        grid[0],
        vec![
            text("entityId"),
            text("companyName"),
            text("sector"),
            text("category"),
            text("price"),
        ]
    );
    assert_eq!(grid.len(), 3);
    assert!(grid.contains(&vec![
        CellValue::Integer(1002),
        text("Globex"),
        text("Energy"),
        text("Mid"),
        CellValue::Number(12.0),
    ]));

    let empty = context.daily_snapshot(&text("1999-12-31"), &text("price"));
    assert_eq!(
        empty.output,
        LookupOutput::Grid(vec![
            vec![
                text("entityId"),
                text("companyName"),
                text("sector"),
                text("category"),
                text("price"),
            ],
            vec![text("#N/A_DATA"), text(""), text(""), text(""), text("")],
        ])
    );
    Ok(())
}

#[test]
fn test_full_history_is_date_ordered() -> Result<()> {
    let fx = fixture()?;
    let context = LookupContext::from_config(&fx.config)?;

    let result = context.full_history(&CellValue::Integer(1001), &text("price"));
    let LookupOutput::Grid(grid) = result.output else {
        panic!("history must return a grid");
    };

    let dates: Vec<String> = grid.iter().skip(1).map(|row| row[0].to_string()).collect();
    assert_eq!(dates, vec!["2024-01-02", "2024-01-04", "2024-02-01"]);
    Ok(())
}

#[test]
fn test_grid_failures_collapse_to_single_token() -> Result<()> {
    let fx = fixture()?;
    let context = LookupContext::from_config(&fx.config)?;

    let bad_type = context.full_history(&text("Acme"), &text("price"));
    assert_eq!(bad_type.output, LookupOutput::Grid(vec![vec![text("#INPUT_ERROR")]]));

    let bad_field = context.daily_snapshot(&text("2024-01-02"), &text("revenue"));
    assert_eq!(bad_field.output, LookupOutput::Grid(vec![vec![text("#INVALID_FIELD")]]));

    let bad_date = context.entity_series(
        &CellValue::Integer(1001),
        &text("price"),
        &text("01/02/2024"),
        &text("2024-01-31"),
    );
    assert_eq!(bad_date.output, LookupOutput::Grid(vec![vec![text("#INPUT_ERROR")]]));

    // Every rejection is still logged
    assert_eq!(fx.log_contents().lines().count(), 3);
    Ok(())
}

#[test]
fn test_missing_database_degrades_to_fallback_and_query_error() -> Result<()> {
    let fx = fixture()?;
    let mut config = fx.config.clone();
    config.database.db_path = fx.dir.path().join("absent.db").display().to_string();

    let context = LookupContext::from_config(&config)?;
    assert_eq!(context.whitelist().source(), WhitelistSource::Fallback);

    let result = context.point_lookup(&CellValue::Integer(1001), &text("price"), &text("2024-01-02"));
    assert_eq!(result.output, LookupOutput::Value(text("#QUERY_ERROR")));
    assert!(fx.log_contents().contains("| Error: Database error: "));
    Ok(())
}

#[test]
fn test_listed_field_missing_from_table_is_query_error() -> Result<()> {
    let fx = fixture()?;
    let store = SqliteStore::new(&fx.config.database.db_path, Duration::from_secs(5));
    let context = LookupContext::builder(Arc::new(store))
        .whitelist(FieldWhitelist::from_fields([
            "entityId", "companyName", "sector", "category", "date", "price", "mcap",
        ]))
        .build()?;

    // A quoted unknown column must not come back as its own name.
    let point = context.point_lookup(&CellValue::Integer(1001), &text("mcap"), &text("2024-01-02"));
    assert_eq!(point.output, LookupOutput::Value(text("#QUERY_ERROR")));
    assert_eq!(point.token, CallerToken::Error(Sentinel::QueryError));

    let history = context.full_history(&CellValue::Integer(1001), &text("mcap"));
    assert_eq!(history.output, LookupOutput::Grid(vec![vec![text("#QUERY_ERROR")]]));
    Ok(())
}

#[test]
fn test_unpadded_dates_match_stored_dates() -> Result<()> {
    let fx = fixture()?;
    let context = LookupContext::from_config(&fx.config)?;

    let point = context.point_lookup(&CellValue::Integer(1001), &text("price"), &text("2024-1-2"));
    assert_eq!(point.output, LookupOutput::Value(CellValue::Number(87.5)));

    let series = context.entity_series(
        &CellValue::Integer(1001),
        &text("price"),
        &text("2024-1-1"),
        &text("2024-1-31"),
    );
    let LookupOutput::Grid(grid) = series.output else {
        panic!("series must return a grid");
    };
    assert_eq!(grid.len(), 3);

    // The call log keeps what the caller typed
    assert!(fx.log_contents().contains("P: (1001, price, 2024-1-2)"));
    Ok(())
}

#[test]
fn test_misconfigured_column_is_query_error_not_invalid_field() -> Result<()> {
    let fx = fixture()?;
    let mut config = fx.config.clone();
    config.columns = ColumnSettings {
        entity_id: "ticker".to_string(),
        ..ColumnSettings::default()
    };
    let context = LookupContext::from_config(&config)?;

    let result = context.point_lookup(&CellValue::Integer(1001), &text("price"), &text("2024-01-02"));
    assert_eq!(result.output, LookupOutput::Value(text("#QUERY_ERROR")));
    assert!(fx
        .log_contents()
        .contains("| Error: Configured column COLUMNS.ENTITY_ID = 'ticker' is not a field of the table"));
    Ok(())
}
