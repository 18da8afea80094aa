use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Normalized source column names, in export order. Shared by ingestion
/// and the query layer so the schema lives in one place.
pub const SOURCE_COLUMNS: [&str; 9] = [
    "transaction_id",
    "date",
    "amount",
    "description",
    "reference",
    "category",
    "currency",
    "counterparty",
    "provider",
];

/// Substring in the reference field that marks a payment-provider invoice.
pub const PROVIDER_MARKER: &str = "STRIPE-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// One raw row from the export, values aligned to the normalized header.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub line_number: usize,
    pub values: Vec<String>,
}

/// One normalized ledger entry.
///
/// The derived fields (`transaction_type`, `month_year`,
/// `is_provider_invoice`, `is_invalid`) are pure functions of the stored
/// fields and are recomputed, never set independently.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub category: Option<String>,
    pub currency: Option<String>,
    pub counterparty: Option<String>,
    pub provider: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub month_year: Option<String>,
    pub is_provider_invoice: bool,
    pub is_invalid: bool,
    pub created_at: DateTime<Utc>,
}

/// Provider-invoice subset row: a transaction whose reference carried the
/// provider marker, with the extracted invoice fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderInvoice {
    pub transaction_id: String,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub reference: String,
    pub invoice_number: Option<String>,
    pub invoice_type: Option<String>,
}

/// Per-category materialized summary, rebuilt on every refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: String,
    pub total_amount: Decimal,
    pub transaction_count: i64,
    pub avg_amount: Decimal,
}
