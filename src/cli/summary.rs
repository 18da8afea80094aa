use colored::Colorize;
use comfy_table::Table;

use crate::aggregator::{Summary, SummaryFilter, SummaryMode};
use crate::cli::parse_date_arg;
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::query;
use crate::settings::db_path;

pub fn run(
    category: Option<String>,
    provider: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    clean: bool,
) -> Result<()> {
    let filter = SummaryFilter {
        category,
        provider,
        start_date: from_date
            .as_deref()
            .map(|d| parse_date_arg(d, "--from"))
            .transpose()?,
        end_date: to_date
            .as_deref()
            .map(|d| parse_date_arg(d, "--to"))
            .transpose()?,
    };
    let mode = if clean {
        SummaryMode::Clean
    } else {
        SummaryMode::Raw
    };

    let conn = get_connection(&db_path())?;
    let summary = query::summary(&conn, &filter, mode)?;
    println!("{}", render(&summary, mode));
    Ok(())
}

fn render(summary: &Summary, mode: SummaryMode) -> String {
    let mut out = String::new();
    let title = match mode {
        SummaryMode::Raw => "SUMMARY",
        SummaryMode::Clean => "SUMMARY (clean)",
    };
    out.push_str(&format!("{}\n\n", title.bold()));
    out.push_str(&format!("Transactions:  {}\n", summary.total_count));
    out.push_str(&format!("Income:        {}\n", money(summary.income_total)));
    out.push_str(&format!("Expenses:      {}\n", money(summary.expense_total)));
    out.push_str(&format!("Net amount:    {}\n", money(summary.total_amount)));
    if let Some(margin) = summary.profit_margin() {
        out.push_str(&format!("Profit margin: {:.1}%\n", margin));
    }
    match &summary.date_range {
        Some(range) => out.push_str(&format!(
            "Date range:    {} to {}\n",
            range.earliest, range.latest
        )),
        None => out.push_str("Date range:    (no dated records)\n"),
    }
    out.push_str(&format!(
        "Invalid:       {} ({:.1}%)\n",
        summary.invalid_count,
        summary.invalid_ratio()
    ));

    for (name, counts) in [
        ("Categories", &summary.categories),
        ("Providers", &summary.providers),
        ("Currencies", &summary.currencies),
    ] {
        if counts.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{name}\n"));
        let mut table = Table::new();
        table.set_header(vec![name, "Count"]);
        for (value, count) in counts {
            table.add_row(vec![value.clone(), count.to_string()]);
        }
        out.push_str(&format!("{table}\n"));
    }
    out
}
