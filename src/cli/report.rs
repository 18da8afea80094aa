use colored::Colorize;
use comfy_table::Table;

use crate::aggregator::{
    monthly_trends, provider_analysis, top_categories, ProviderAnalysis,
};
use crate::db::{fetch_all_transactions, fetch_category_summaries, fetch_provider_invoices,
                get_connection};
use crate::error::{IvyError, Result};
use crate::fmt::money;
use crate::models::TransactionType;
use crate::settings::db_path;

pub fn categories() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let summaries = fetch_category_summaries(&conn)?;
    if summaries.is_empty() {
        println!("No categories. Run `ivy load <export.csv>` first.");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Category", "Total", "Count", "Average"]);
    for summary in &summaries {
        table.add_row(vec![
            summary.category.clone(),
            money(summary.total_amount),
            summary.transaction_count.to_string(),
            money(summary.avg_amount),
        ]);
    }
    println!("{}", "CATEGORY SUMMARY".bold());
    println!("{table}");
    Ok(())
}

pub fn monthly() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let records = fetch_all_transactions(&conn)?;
    let trends = monthly_trends(&records);
    if trends.is_empty() {
        println!("No dated records to bucket by month.");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Month", "Income", "Expenses", "Net", "Count"]);
    for trend in &trends {
        table.add_row(vec![
            trend.month_year.clone(),
            money(trend.income),
            money(trend.expenses),
            money(trend.net),
            trend.count.to_string(),
        ]);
    }
    println!("{}", "MONTHLY TRENDS".bold());
    println!("{table}");
    Ok(())
}

pub fn top(transaction_type: &str, limit: usize) -> Result<()> {
    let transaction_type = TransactionType::from_str(transaction_type).ok_or_else(|| {
        IvyError::Other(format!(
            "--type expects expense or income, got {transaction_type:?}"
        ))
    })?;
    let conn = get_connection(&db_path())?;
    let records = fetch_all_transactions(&conn)?;
    let top = top_categories(&records, transaction_type, limit);
    if top.is_empty() {
        println!("No {} records to rank.", transaction_type.as_str());
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Category", "Total", "Count", "Average"]);
    for item in &top {
        table.add_row(vec![
            item.category.clone(),
            money(item.total),
            item.count.to_string(),
            money(item.avg),
        ]);
    }
    println!(
        "{}",
        format!("TOP {} CATEGORIES", transaction_type.as_str().to_uppercase()).bold()
    );
    println!("{table}");
    Ok(())
}

pub fn providers() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let invoices = fetch_provider_invoices(&conn)?;
    let analysis = provider_analysis(&invoices);
    println!("{}", render_providers(&analysis));
    Ok(())
}

fn render_providers(analysis: &ProviderAnalysis) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", "PROVIDER INVOICE ANALYSIS".bold()));
    out.push_str(&format!("Invoices:       {}\n", analysis.invoice_count));
    out.push_str(&format!("Total revenue:  {}\n", money(analysis.total_revenue)));
    out.push_str(&format!("Average:        {}\n", money(analysis.avg_invoice)));
    if let (Some(first), Some(last)) = (analysis.first_invoice, analysis.last_invoice) {
        out.push_str(&format!("First invoice:  {first}\n"));
        out.push_str(&format!("Last invoice:   {last}\n"));
    }
    if !analysis.by_type.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Type", "Count", "Total"]);
        for item in &analysis.by_type {
            table.add_row(vec![
                item.invoice_type.clone(),
                item.count.to_string(),
                money(item.total),
            ]);
        }
        out.push_str(&format!("\n{table}\n"));
    }
    out
}

pub fn invalid() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let records = fetch_all_transactions(&conn)?;
    let invalid: Vec<_> = records.iter().filter(|r| r.is_invalid).collect();
    let total = records.len();

    println!("{}", "INVALID RECORDS".bold());
    if total == 0 {
        println!("Dataset is empty.");
        return Ok(());
    }
    println!(
        "{} of {} records ({:.1}%)",
        invalid.len(),
        total,
        invalid.len() as f64 * 100.0 / total as f64
    );
    if invalid.is_empty() {
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Amount", "Description", "Category"]);
    for record in invalid {
        table.add_row(vec![
            record.transaction_id.clone(),
            record
                .date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "(none)".to_string()),
            record
                .amount
                .map(money)
                .unwrap_or_else(|| "(none)".to_string()),
            record
                .description
                .clone()
                .unwrap_or_else(|| "(none)".to_string()),
            record
                .category
                .clone()
                .unwrap_or_else(|| "(none)".to_string()),
        ]);
    }
    println!("{table}");
    Ok(())
}
