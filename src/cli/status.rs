use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{db_path, get_data_dir};

pub fn run() -> Result<()> {
    let data_dir = get_data_dir();
    let db_path = db_path();

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `ivy init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let transactions: i64 =
        conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
    let invalid: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE is_invalid = 1",
        [],
        |r| r.get(0),
    )?;
    let invoices: i64 =
        conn.query_row("SELECT count(*) FROM provider_invoices", [], |r| r.get(0))?;
    let categories: i64 =
        conn.query_row("SELECT count(*) FROM category_summary", [], |r| r.get(0))?;

    println!();
    println!("Transactions:      {transactions}");
    println!("Invalid:           {invalid}");
    println!("Provider invoices: {invoices}");
    println!("Categories:        {categories}");

    let last: Option<(String, String, i64)> = conn
        .query_row(
            "SELECT filename, refreshed_at, record_count FROM refreshes \
             ORDER BY id DESC LIMIT 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .ok();
    if let Some((filename, refreshed_at, record_count)) = last {
        println!();
        println!("Last refresh: {filename} ({record_count} records) at {refreshed_at}");
    }
    Ok(())
}
