use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::query;
use crate::settings::db_path;

pub fn run(id: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let record = query::get_by_id(&conn, id)?;

    println!("Transaction:   {}", record.transaction_id);
    println!(
        "Date:          {}",
        record.date.map(|d| d.to_string()).unwrap_or_else(|| "(none)".to_string())
    );
    println!(
        "Amount:        {}",
        record.amount.map(money).unwrap_or_else(|| "(none)".to_string())
    );
    println!("Description:   {}", record.description.as_deref().unwrap_or("(none)"));
    println!("Reference:     {}", record.reference.as_deref().unwrap_or("(none)"));
    println!("Category:      {}", record.category.as_deref().unwrap_or("(none)"));
    println!("Currency:      {}", record.currency.as_deref().unwrap_or("(none)"));
    println!("Counterparty:  {}", record.counterparty.as_deref().unwrap_or("(none)"));
    println!("Provider:      {}", record.provider.as_deref().unwrap_or("(none)"));
    println!(
        "Type:          {}",
        record
            .transaction_type
            .map(|t| t.as_str())
            .unwrap_or("(none)")
    );
    println!(
        "Month:         {}",
        record.month_year.as_deref().unwrap_or("(none)")
    );
    println!("Provider inv.: {}", record.is_provider_invoice);
    println!("Invalid:       {}", record.is_invalid);
    println!("Ingested at:   {}", record.created_at.to_rfc3339());
    Ok(())
}
