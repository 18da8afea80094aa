use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{FieldParseError, IvyError, Result};
use crate::importer::ParsedSource;
use crate::models::{
    ProviderInvoice, RawRow, TransactionRecord, TransactionType, PROVIDER_MARKER, SOURCE_COLUMNS,
};

// ---------------------------------------------------------------------------
// Field coercion helpers
// ---------------------------------------------------------------------------

/// Coerce an amount string to a decimal. Strips thousands separators,
/// currency symbols and a redundant quote layer; a parenthesized value is
/// negative. Returns None when the field is empty or unparsable.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<Decimal>().ok().map(|d| -d);
    }
    s.parse().ok()
}

/// Parse a calendar date: ISO `YYYY-MM-DD` first, then `MM/DD/YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

// ---------------------------------------------------------------------------
// Derived fields — pure functions of the stored fields
// ---------------------------------------------------------------------------

pub fn derive_type(amount: Option<Decimal>) -> Option<TransactionType> {
    let amount = amount?;
    if amount > Decimal::ZERO {
        Some(TransactionType::Income)
    } else if amount < Decimal::ZERO {
        Some(TransactionType::Expense)
    } else {
        None
    }
}

pub fn derive_month_year(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m").to_string())
}

pub fn derive_is_provider_invoice(reference: Option<&str>) -> bool {
    reference.is_some_and(|r| r.contains(PROVIDER_MARKER))
}

pub fn derive_is_invalid(
    amount: Option<Decimal>,
    description: Option<&str>,
    category: Option<&str>,
) -> bool {
    amount.is_none() || description.is_none() || category.is_none() || amount == Some(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ColumnIndexes {
    transaction_id: usize,
    date: Option<usize>,
    amount: Option<usize>,
    description: Option<usize>,
    reference: Option<usize>,
    category: Option<usize>,
    currency: Option<usize>,
    counterparty: Option<usize>,
    provider: Option<usize>,
}

/// Maps raw rows to normalized records. Column positions and the invoice
/// patterns are resolved once at construction; the instance is then a pure
/// row mapper — identical rows always yield identical records.
#[derive(Debug)]
pub struct Normalizer {
    idx: ColumnIndexes,
    invoice_number_re: Regex,
    invoice_type_re: Regex,
    created_at: DateTime<Utc>,
}

impl Normalizer {
    /// `created_at` is the ingestion timestamp stamped on every record of
    /// the run, supplied by the caller so a run is reproducible.
    pub fn new(source: &ParsedSource, created_at: DateTime<Utc>) -> Result<Self> {
        // Positions follow models::SOURCE_COLUMNS, the one shared schema.
        let [id, date, amount, description, reference, category, currency, counterparty, provider] =
            SOURCE_COLUMNS.map(|name| source.column_index(name));
        let idx = ColumnIndexes {
            transaction_id: id.ok_or_else(|| {
                IvyError::MalformedInput(
                    "header is missing the transaction_id column".to_string(),
                )
            })?,
            date,
            amount,
            description,
            reference,
            category,
            currency,
            counterparty,
            provider,
        };
        // Pattern literals are fixed; compilation cannot fail.
        let invoice_number_re = Regex::new(&format!("{PROVIDER_MARKER}(\\d+)"))
            .map_err(|e| IvyError::Other(e.to_string()))?;
        let invoice_type_re = Regex::new(r"(?i)^(.*?)\s+(?:payment|revenue)\b")
            .map_err(|e| IvyError::Other(e.to_string()))?;
        Ok(Self {
            idx,
            invoice_number_re,
            invoice_type_re,
            created_at,
        })
    }

    fn field<'a>(&self, row: &'a RawRow, idx: Option<usize>) -> Option<&'a str> {
        let value = row.values.get(idx?)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Map one raw row. Field coercion failures are returned alongside the
    /// record, which is marked invalid; the batch never aborts for them.
    pub fn normalize_row(&self, row: &RawRow) -> (TransactionRecord, Vec<FieldParseError>) {
        let mut field_errors = Vec::new();

        let transaction_id = row
            .values
            .get(self.idx.transaction_id)
            .map(|v| v.trim().to_string())
            .unwrap_or_default();

        let raw_date = self.field(row, self.idx.date);
        let date = match raw_date {
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    field_errors.push(FieldParseError {
                        field: "date",
                        value: raw.to_string(),
                    });
                }
                parsed
            }
            None => None,
        };

        let raw_amount = self.field(row, self.idx.amount);
        let amount = match raw_amount {
            Some(raw) => {
                let parsed = parse_amount(raw);
                if parsed.is_none() {
                    field_errors.push(FieldParseError {
                        field: "amount",
                        value: raw.to_string(),
                    });
                }
                parsed
            }
            None => None,
        };

        let description = self.field(row, self.idx.description).map(str::to_string);
        let reference = self.field(row, self.idx.reference).map(str::to_string);
        let category = self.field(row, self.idx.category).map(str::to_string);

        // An unparsable date also fails structural completeness.
        let is_invalid = derive_is_invalid(amount, description.as_deref(), category.as_deref())
            || (raw_date.is_some() && date.is_none());

        let record = TransactionRecord {
            transaction_id,
            date,
            amount,
            description,
            reference: reference.clone(),
            category,
            currency: self.field(row, self.idx.currency).map(str::to_string),
            counterparty: self.field(row, self.idx.counterparty).map(str::to_string),
            provider: self.field(row, self.idx.provider).map(str::to_string),
            transaction_type: derive_type(amount),
            month_year: derive_month_year(date),
            is_provider_invoice: derive_is_provider_invoice(reference.as_deref()),
            is_invalid,
            created_at: self.created_at,
        };

        (record, field_errors)
    }

    /// Single deterministic pass over the whole input, first-appearance
    /// order preserved.
    pub fn normalize_all(
        &self,
        rows: &[RawRow],
    ) -> (Vec<TransactionRecord>, Vec<FieldParseError>) {
        let mut records = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();
        for row in rows {
            let (record, mut errs) = self.normalize_row(row);
            records.push(record);
            errors.append(&mut errs);
        }
        (records, errors)
    }

    /// Extract the provider-invoice view of a record, when its reference
    /// carries the marker.
    pub fn provider_invoice(&self, record: &TransactionRecord) -> Option<ProviderInvoice> {
        if !record.is_provider_invoice {
            return None;
        }
        let reference = record.reference.clone()?;
        let invoice_number = self
            .invoice_number_re
            .captures(&reference)
            .map(|c| c[1].to_string());
        let invoice_type = record.description.as_deref().and_then(|d| {
            self.invoice_type_re
                .captures(d)
                .map(|c| c[1].trim().to_string())
        });
        Some(ProviderInvoice {
            transaction_id: record.transaction_id.clone(),
            date: record.date,
            amount: record.amount,
            description: record.description.clone(),
            reference,
            invoice_number,
            invoice_type,
        })
    }
}
