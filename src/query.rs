use rusqlite::Connection;

use crate::aggregator::{summarize, Summary, SummaryFilter, SummaryMode};
use crate::db::{fetch_all_transactions, row_to_record, TRANSACTION_COLUMNS};
use crate::error::{IvyError, Result};
use crate::models::TransactionRecord;

/// Bounded listing, date descending (dateless records last), insertion
/// order as tiebreak. The limit must be a positive integer.
pub fn list(conn: &Connection, limit: i64) -> Result<Vec<TransactionRecord>> {
    if limit <= 0 {
        return Err(IvyError::Other(format!(
            "limit must be a positive integer, got {limit}"
        )));
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         ORDER BY date IS NULL, date DESC, rowid LIMIT ?1"
    ))?;
    let records = stmt
        .query_map([limit], row_to_record)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn get_by_id(conn: &Connection, transaction_id: &str) -> Result<TransactionRecord> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE transaction_id = ?1"
    ))?;
    let mut rows = stmt.query_map([transaction_id], row_to_record)?;
    match rows.next() {
        Some(row) => Ok(row?),
        None => Err(IvyError::NotFound(format!(
            "transaction {transaction_id}"
        ))),
    }
}

/// Aggregate over the current snapshot. Filters combine with AND; data
/// quality never makes this fail — invalid records are reported as counts.
pub fn summary(
    conn: &Connection,
    filter: &SummaryFilter,
    mode: SummaryMode,
) -> Result<Summary> {
    let records = fetch_all_transactions(conn)?;
    Ok(summarize(&records, filter, mode))
}
