use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{CategorySummary, ProviderInvoice, TransactionRecord, TransactionType};

// Amounts are stored as canonical decimal strings: SQLite has no decimal
// type and REAL would reintroduce float drift.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    transaction_id TEXT PRIMARY KEY,
    date TEXT,
    amount TEXT,
    description TEXT,
    reference TEXT,
    category TEXT,
    currency TEXT,
    counterparty TEXT,
    provider TEXT,
    transaction_type TEXT,
    month_year TEXT,
    is_provider_invoice INTEGER NOT NULL DEFAULT 0,
    is_invalid INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS provider_invoices (
    transaction_id TEXT PRIMARY KEY,
    date TEXT,
    amount TEXT,
    description TEXT,
    reference TEXT NOT NULL,
    invoice_number TEXT,
    invoice_type TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS category_summary (
    category TEXT PRIMARY KEY,
    total_amount TEXT NOT NULL,
    transaction_count INTEGER NOT NULL,
    avg_amount TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS refreshes (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    checksum TEXT,
    record_count INTEGER,
    invalid_count INTEGER,
    field_error_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    refreshed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category);
CREATE INDEX IF NOT EXISTS idx_transactions_amount ON transactions(amount);
CREATE INDEX IF NOT EXISTS idx_transactions_type ON transactions(transaction_type);
CREATE INDEX IF NOT EXISTS idx_provider_invoices_date ON provider_invoices(date);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Column codecs
// ---------------------------------------------------------------------------

fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Decimal::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
    })
    .transpose()
}

fn date_column(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
    })
    .transpose()
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn store_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn store_decimal(amount: Option<Decimal>) -> Option<String> {
    amount.map(|a| a.to_string())
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

pub fn insert_transaction(conn: &Connection, record: &TransactionRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions (transaction_id, date, amount, description, reference, \
         category, currency, counterparty, provider, transaction_type, month_year, \
         is_provider_invoice, is_invalid, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        rusqlite::params![
            record.transaction_id,
            store_date(record.date),
            store_decimal(record.amount),
            record.description,
            record.reference,
            record.category,
            record.currency,
            record.counterparty,
            record.provider,
            record.transaction_type.map(|t| t.as_str()),
            record.month_year,
            record.is_provider_invoice,
            record.is_invalid,
            record.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn row_to_record(row: &Row) -> rusqlite::Result<TransactionRecord> {
    let transaction_type: Option<String> = row.get(9)?;
    Ok(TransactionRecord {
        transaction_id: row.get(0)?,
        date: date_column(row, 1)?,
        amount: decimal_column(row, 2)?,
        description: row.get(3)?,
        reference: row.get(4)?,
        category: row.get(5)?,
        currency: row.get(6)?,
        counterparty: row.get(7)?,
        provider: row.get(8)?,
        transaction_type: transaction_type.as_deref().and_then(TransactionType::from_str),
        month_year: row.get(10)?,
        is_provider_invoice: row.get(11)?,
        is_invalid: row.get(12)?,
        created_at: timestamp_column(row, 13)?,
    })
}

pub const TRANSACTION_COLUMNS: &str = "transaction_id, date, amount, description, reference, \
     category, currency, counterparty, provider, transaction_type, month_year, \
     is_provider_invoice, is_invalid, created_at";

/// All records in first-appearance (insertion) order.
pub fn fetch_all_transactions(conn: &Connection) -> Result<Vec<TransactionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY rowid"
    ))?;
    let records = stmt
        .query_map([], row_to_record)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

// ---------------------------------------------------------------------------
// Provider invoices
// ---------------------------------------------------------------------------

pub fn insert_provider_invoice(
    conn: &Connection,
    invoice: &ProviderInvoice,
    created_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO provider_invoices (transaction_id, date, amount, description, reference, \
         invoice_number, invoice_type, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            invoice.transaction_id,
            store_date(invoice.date),
            store_decimal(invoice.amount),
            invoice.description,
            invoice.reference,
            invoice.invoice_number,
            invoice.invoice_type,
            created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn row_to_invoice(row: &Row) -> rusqlite::Result<ProviderInvoice> {
    Ok(ProviderInvoice {
        transaction_id: row.get(0)?,
        date: date_column(row, 1)?,
        amount: decimal_column(row, 2)?,
        description: row.get(3)?,
        reference: row.get(4)?,
        invoice_number: row.get(5)?,
        invoice_type: row.get(6)?,
    })
}

pub fn fetch_provider_invoices(conn: &Connection) -> Result<Vec<ProviderInvoice>> {
    let mut stmt = conn.prepare(
        "SELECT transaction_id, date, amount, description, reference, invoice_number, \
         invoice_type FROM provider_invoices ORDER BY rowid",
    )?;
    let invoices = stmt
        .query_map([], row_to_invoice)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(invoices)
}

// ---------------------------------------------------------------------------
// Category summary (materialized)
// ---------------------------------------------------------------------------

pub fn insert_category_summary(
    conn: &Connection,
    summary: &CategorySummary,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO category_summary (category, total_amount, transaction_count, avg_amount, \
         updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            summary.category,
            summary.total_amount.to_string(),
            summary.transaction_count,
            summary.avg_amount.to_string(),
            updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn fetch_category_summaries(conn: &Connection) -> Result<Vec<CategorySummary>> {
    let mut stmt = conn.prepare(
        "SELECT category, total_amount, transaction_count, avg_amount FROM category_summary \
         ORDER BY category",
    )?;
    let summaries = stmt
        .query_map([], |row| {
            Ok(CategorySummary {
                category: row.get(0)?,
                total_amount: decimal_column(row, 1)?.unwrap_or(Decimal::ZERO),
                transaction_count: row.get(2)?,
                avg_amount: decimal_column(row, 3)?.unwrap_or(Decimal::ZERO),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn sample_record() -> TransactionRecord {
        TransactionRecord {
            transaction_id: "TX001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15),
            amount: Some(dec!(150.00)),
            description: Some("Office Supplies".to_string()),
            reference: Some("REF123".to_string()),
            category: Some("Supplies".to_string()),
            currency: Some("USD".to_string()),
            counterparty: Some("VendorX".to_string()),
            provider: None,
            transaction_type: Some(TransactionType::Income),
            month_year: Some("2024-03".to_string()),
            is_provider_invoice: false,
            is_invalid: false,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["transactions", "provider_invoices", "category_summary", "refreshes"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_init_db_creates_indexes() {
        let (_dir, conn) = test_db();
        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "idx_transactions_date",
            "idx_transactions_category",
            "idx_transactions_amount",
        ] {
            assert!(indexes.contains(&expected.to_string()), "missing index: {expected}");
        }
    }

    #[test]
    fn test_transaction_round_trip() {
        let (_dir, conn) = test_db();
        let record = sample_record();
        insert_transaction(&conn, &record).unwrap();
        let fetched = fetch_all_transactions(&conn).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0], record);
    }

    #[test]
    fn test_amount_precision_survives_storage() {
        let (_dir, conn) = test_db();
        let mut record = sample_record();
        record.amount = Some(dec!(0.10));
        insert_transaction(&conn, &record).unwrap();
        let fetched = fetch_all_transactions(&conn).unwrap();
        assert_eq!(fetched[0].amount, Some(dec!(0.10)));
    }

    #[test]
    fn test_optional_fields_round_trip_as_null() {
        let (_dir, conn) = test_db();
        let record = TransactionRecord {
            transaction_id: "TX002".to_string(),
            date: None,
            amount: None,
            description: None,
            reference: None,
            category: None,
            currency: None,
            counterparty: None,
            provider: None,
            transaction_type: None,
            month_year: None,
            is_provider_invoice: false,
            is_invalid: true,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        };
        insert_transaction(&conn, &record).unwrap();
        let fetched = fetch_all_transactions(&conn).unwrap();
        assert_eq!(fetched[0], record);
    }

    #[test]
    fn test_provider_invoice_round_trip() {
        let (_dir, conn) = test_db();
        let invoice = ProviderInvoice {
            transaction_id: "TX003".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 2),
            amount: Some(dec!(99.00)),
            description: Some("Consulting payment".to_string()),
            reference: "STRIPE-4821".to_string(),
            invoice_number: Some("4821".to_string()),
            invoice_type: Some("Consulting".to_string()),
        };
        insert_provider_invoice(&conn, &invoice, Utc::now()).unwrap();
        let fetched = fetch_provider_invoices(&conn).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0], invoice);
    }

    #[test]
    fn test_category_summary_round_trip() {
        let (_dir, conn) = test_db();
        let summary = CategorySummary {
            category: "Supplies".to_string(),
            total_amount: dec!(25),
            transaction_count: 3,
            avg_amount: dec!(25) / dec!(3),
        };
        insert_category_summary(&conn, &summary, Utc::now()).unwrap();
        let fetched = fetch_category_summaries(&conn).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0], summary);
    }
}
