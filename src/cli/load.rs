use std::path::PathBuf;

use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::pipeline::refresh_from_file;
use crate::settings::{db_path, get_data_dir};

pub fn run(file: &str) -> Result<()> {
    let file_path = PathBuf::from(file);
    std::fs::create_dir_all(get_data_dir())?;
    let mut conn = get_connection(&db_path())?;
    init_db(&conn)?;

    let result = refresh_from_file(&mut conn, &file_path)?;

    println!(
        "{} {} records ({} provider invoices)",
        "Loaded".green(),
        result.record_count,
        result.provider_invoice_count
    );
    if result.invalid_count > 0 {
        println!(
            "{} {} invalid records, {} field parse failures",
            "Flagged".yellow(),
            result.invalid_count,
            result.field_error_count
        );
    }
    if let Some((start, end)) = result.date_range {
        println!("Date range: {start} to {end}");
    }
    Ok(())
}
