use std::time::Duration;

use colored::Colorize;

use crate::db::get_connection;
use crate::error::{IvyError, Result};
use crate::invoices::{download_and_verify, CommandExtractor, CommandRetriever, RetryPolicy};
use crate::query;
use crate::settings::{db_path, load_settings};

pub fn fetch(id: &str, locator: &str) -> Result<()> {
    let settings = load_settings();
    let retriever = command_parts(&settings.retriever_cmd, "retriever")?;
    let extractor = command_parts(&settings.extractor_cmd, "extractor")?;
    let timeout = Duration::from_secs(settings.collaborator_timeout_secs);

    let retriever = CommandRetriever {
        program: retriever.0,
        args: retriever.1,
        timeout,
    };
    let extractor = CommandExtractor {
        program: extractor.0,
        args: extractor.1,
        timeout,
    };
    let policy = RetryPolicy {
        max_attempts: settings.collaborator_max_attempts,
    };

    let conn = get_connection(&db_path())?;
    let record = query::get_by_id(&conn, id)?;

    let (file, extracted, mismatches) =
        download_and_verify(&retriever, &extractor, &record, locator, policy)?;

    println!("{} {}", "Downloaded".green(), file.display());
    println!("Invoice number:   {}", extracted.invoice_number);
    println!("Invoice date:     {}", extracted.invoice_date);
    println!("Invoice amount:   {}", extracted.invoice_amount);
    println!("Invoice currency: {}", extracted.invoice_currency);

    if mismatches.is_empty() {
        println!("{}", "Document agrees with the ledger.".green());
    } else {
        println!("{}", "Mismatches against the ledger:".yellow());
        for mismatch in &mismatches {
            println!("  - {mismatch}");
        }
    }
    Ok(())
}

fn command_parts(cmd: &[String], which: &str) -> Result<(String, Vec<String>)> {
    match cmd.split_first() {
        Some((program, args)) => Ok((program.clone(), args.to_vec())),
        None => Err(IvyError::Settings(format!(
            "no invoice {which} configured; set {which}_cmd in settings.json"
        ))),
    }
}
