use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::models::TransactionRecord;
use crate::query;
use crate::settings::db_path;

pub fn run(limit: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let records = query::list(&conn, limit)?;
    if records.is_empty() {
        println!("No transactions loaded. Run `ivy load <export.csv>` first.");
        return Ok(());
    }
    println!("{}", render(&records));
    Ok(())
}

fn render(records: &[TransactionRecord]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Date", "ID", "Description", "Amount", "Category", "Flags"]);
    for record in records {
        let mut flags = Vec::new();
        if record.is_provider_invoice {
            flags.push("invoice");
        }
        if record.is_invalid {
            flags.push("invalid");
        }
        table.add_row(vec![
            Cell::new(
                record
                    .date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "—".to_string()),
            ),
            Cell::new(&record.transaction_id),
            Cell::new(record.description.as_deref().unwrap_or("—")),
            Cell::new(
                record
                    .amount
                    .map(money)
                    .unwrap_or_else(|| "—".to_string()),
            ),
            Cell::new(record.category.as_deref().unwrap_or("—")),
            Cell::new(flags.join(", ")),
        ]);
    }
    table.to_string()
}
