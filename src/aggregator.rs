use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{CategorySummary, ProviderInvoice, TransactionRecord, TransactionType};

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub category: Option<String>,
    pub provider: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Raw counts every matching record, invalid ones included, for
/// data-quality review. Clean drops invalid records from financial totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryMode {
    #[default]
    Raw,
    Clean,
}

pub fn matches_filter(record: &TransactionRecord, filter: &SummaryFilter) -> bool {
    if let Some(category) = &filter.category {
        if record.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    if let Some(provider) = &filter.provider {
        if record.provider.as_deref() != Some(provider.as_str()) {
            return false;
        }
    }
    if let Some(start) = filter.start_date {
        match record.date {
            Some(d) if d >= start => {}
            _ => return false,
        }
    }
    if let Some(end) = filter.end_date {
        match record.date {
            Some(d) if d <= end => {}
            _ => return false,
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_count: usize,
    /// Signed net sum — expenses stay negative, matching balance semantics.
    pub total_amount: Decimal,
    pub income_total: Decimal,
    /// Absolute value of the matching outflows.
    pub expense_total: Decimal,
    pub categories: BTreeMap<String, i64>,
    pub providers: BTreeMap<String, i64>,
    pub currencies: BTreeMap<String, i64>,
    pub date_range: Option<DateRange>,
    pub invalid_count: usize,
}

impl Summary {
    /// Share of matching records that failed structural checks, in percent.
    pub fn invalid_ratio(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.invalid_count as f64 * 100.0 / self.total_count as f64
        }
    }

    /// Income share of gross volume, in percent. None when nothing moved.
    pub fn profit_margin(&self) -> Option<Decimal> {
        let gross = self.income_total + self.expense_total;
        if gross == Decimal::ZERO {
            None
        } else {
            Some(self.income_total * Decimal::ONE_HUNDRED / gross)
        }
    }
}

pub fn summarize(
    records: &[TransactionRecord],
    filter: &SummaryFilter,
    mode: SummaryMode,
) -> Summary {
    let mut total_count = 0usize;
    let mut invalid_count = 0usize;
    let mut total_amount = Decimal::ZERO;
    let mut income_total = Decimal::ZERO;
    let mut expense_total = Decimal::ZERO;
    let mut categories = BTreeMap::new();
    let mut providers = BTreeMap::new();
    let mut currencies = BTreeMap::new();
    let mut earliest: Option<NaiveDate> = None;
    let mut latest: Option<NaiveDate> = None;

    for record in records.iter().filter(|r| matches_filter(r, filter)) {
        if record.is_invalid {
            invalid_count += 1;
            if mode == SummaryMode::Clean {
                continue;
            }
        }
        total_count += 1;
        if let Some(amount) = record.amount {
            total_amount += amount;
            if amount > Decimal::ZERO {
                income_total += amount;
            } else {
                expense_total += -amount;
            }
        }
        if let Some(category) = &record.category {
            *categories.entry(category.clone()).or_insert(0) += 1;
        }
        if let Some(provider) = &record.provider {
            *providers.entry(provider.clone()).or_insert(0) += 1;
        }
        if let Some(currency) = &record.currency {
            *currencies.entry(currency.clone()).or_insert(0) += 1;
        }
        if let Some(date) = record.date {
            earliest = Some(earliest.map_or(date, |e| e.min(date)));
            latest = Some(latest.map_or(date, |l| l.max(date)));
        }
    }

    let date_range = match (earliest, latest) {
        (Some(earliest), Some(latest)) => Some(DateRange { earliest, latest }),
        _ => None,
    };

    Summary {
        total_count,
        total_amount,
        income_total,
        expense_total,
        categories,
        providers,
        currencies,
        date_range,
        invalid_count,
    }
}

// ---------------------------------------------------------------------------
// Monthly trends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTrend {
    pub month_year: String,
    pub income: Decimal,
    /// Absolute value of the month's outflows, for display.
    pub expenses: Decimal,
    pub net: Decimal,
    pub count: usize,
}

/// Time-bucketed income/expense split. Records without a date carry no
/// month bucket and are excluded.
pub fn monthly_trends(records: &[TransactionRecord]) -> Vec<MonthlyTrend> {
    let mut buckets: BTreeMap<String, MonthlyTrend> = BTreeMap::new();
    for record in records {
        let Some(month_year) = &record.month_year else {
            continue;
        };
        let entry = buckets
            .entry(month_year.clone())
            .or_insert_with(|| MonthlyTrend {
                month_year: month_year.clone(),
                income: Decimal::ZERO,
                expenses: Decimal::ZERO,
                net: Decimal::ZERO,
                count: 0,
            });
        entry.count += 1;
        if let Some(amount) = record.amount {
            if amount > Decimal::ZERO {
                entry.income += amount;
            } else {
                entry.expenses += -amount;
            }
            entry.net += amount;
        }
    }
    buckets.into_values().collect()
}

// ---------------------------------------------------------------------------
// Category summaries (materialized-view shape)
// ---------------------------------------------------------------------------

/// Per-category signed total, count and mean over records that carry a
/// category. Sorted by category name.
pub fn category_summaries(records: &[TransactionRecord]) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<String, (Decimal, i64)> = BTreeMap::new();
    for record in records {
        let Some(category) = &record.category else {
            continue;
        };
        let entry = groups.entry(category.clone()).or_insert((Decimal::ZERO, 0));
        if let Some(amount) = record.amount {
            entry.0 += amount;
        }
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(category, (total_amount, transaction_count))| CategorySummary {
            category,
            total_amount,
            transaction_count,
            avg_amount: total_amount / Decimal::from(transaction_count),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Top categories (ranking display)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TopCategory {
    pub category: String,
    /// Absolute volume — ranking displays use magnitudes, not net sums.
    pub total: Decimal,
    pub count: i64,
    pub avg: Decimal,
}

pub fn top_categories(
    records: &[TransactionRecord],
    transaction_type: TransactionType,
    limit: usize,
) -> Vec<TopCategory> {
    let mut groups: BTreeMap<String, (Decimal, i64)> = BTreeMap::new();
    for record in records {
        if record.transaction_type != Some(transaction_type) {
            continue;
        }
        let Some(category) = &record.category else {
            continue;
        };
        let Some(amount) = record.amount else {
            continue;
        };
        let entry = groups.entry(category.clone()).or_insert((Decimal::ZERO, 0));
        entry.0 += amount.abs();
        entry.1 += 1;
    }
    let mut items: Vec<TopCategory> = groups
        .into_iter()
        .map(|(category, (total, count))| TopCategory {
            category,
            total,
            count,
            avg: total / Decimal::from(count),
        })
        .collect();
    items.sort_by(|a, b| b.total.cmp(&a.total).then(a.category.cmp(&b.category)));
    items.truncate(limit);
    items
}

// ---------------------------------------------------------------------------
// Provider-invoice analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTypeSummary {
    pub invoice_type: String,
    pub count: usize,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAnalysis {
    pub invoice_count: usize,
    pub total_revenue: Decimal,
    pub avg_invoice: Decimal,
    pub first_invoice: Option<NaiveDate>,
    pub last_invoice: Option<NaiveDate>,
    pub by_type: Vec<InvoiceTypeSummary>,
}

pub fn provider_analysis(invoices: &[ProviderInvoice]) -> ProviderAnalysis {
    let mut total_revenue = Decimal::ZERO;
    let mut priced = 0i64;
    let mut first_invoice: Option<NaiveDate> = None;
    let mut last_invoice: Option<NaiveDate> = None;
    let mut by_type: BTreeMap<String, (usize, Decimal)> = BTreeMap::new();

    for invoice in invoices {
        if let Some(amount) = invoice.amount {
            total_revenue += amount;
            priced += 1;
        }
        if let Some(date) = invoice.date {
            first_invoice = Some(first_invoice.map_or(date, |f| f.min(date)));
            last_invoice = Some(last_invoice.map_or(date, |l| l.max(date)));
        }
        let key = invoice
            .invoice_type
            .clone()
            .unwrap_or_else(|| "(untyped)".to_string());
        let entry = by_type.entry(key).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += invoice.amount.unwrap_or(Decimal::ZERO);
    }

    let avg_invoice = if priced > 0 {
        total_revenue / Decimal::from(priced)
    } else {
        Decimal::ZERO
    };

    let mut by_type: Vec<InvoiceTypeSummary> = by_type
        .into_iter()
        .map(|(invoice_type, (count, total))| InvoiceTypeSummary {
            invoice_type,
            count,
            total,
        })
        .collect();
    by_type.sort_by(|a, b| b.total.cmp(&a.total).then(a.invoice_type.cmp(&b.invoice_type)));

    ProviderAnalysis {
        invoice_count: invoices.len(),
        total_revenue,
        avg_invoice,
        first_invoice,
        last_invoice,
        by_type,
    }
}
