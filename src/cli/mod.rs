pub mod ask;
pub mod demo;
pub mod get;
pub mod init;
pub mod invoices;
pub mod list;
pub mod load;
pub mod report;
pub mod status;
pub mod summary;

use clap::{Parser, Subcommand};

use crate::error::{IvyError, Result};

pub(crate) fn parse_date_arg(raw: &str, flag: &str) -> Result<chrono::NaiveDate> {
    crate::normalizer::parse_date(raw)
        .ok_or_else(|| IvyError::Other(format!("{flag} expects a date like 2024-03-15, got {raw:?}")))
}

#[derive(Parser)]
#[command(
    name = "ivy",
    about = "Transaction ingestion and analytics for financial ledger exports."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up ivy: choose a data directory and initialize the database.
    Init {
        /// Path for ivy data (default: ~/Documents/ivy)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Ingest a ledger export file, replacing the whole dataset.
    Load {
        /// Path to the exported CSV
        file: String,
    },
    /// List the most recent transactions.
    List {
        /// Maximum number of rows (must be positive)
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Show one transaction by id.
    Get {
        /// Transaction id, e.g. TX001
        id: String,
    },
    /// Aggregate summary over the dataset, with optional filters.
    Summary {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
        /// Filter by provider
        #[arg(long)]
        provider: Option<String>,
        /// Start date: YYYY-MM-DD
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date: YYYY-MM-DD
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Exclude structurally invalid records from the totals
        #[arg(long)]
        clean: bool,
    },
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Route a free-form question to the matching canned analysis.
    Ask {
        /// The question, e.g. "show top expense categories"
        question: Vec<String>,
    },
    /// Fetch and cross-check invoice documents via the configured services.
    Invoices {
        #[command(subcommand)]
        command: InvoicesCommands,
    },
    /// Show current database and refresh statistics.
    Status,
    /// Load a small sample export to explore ivy.
    Demo,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Per-category totals, counts and averages.
    Categories,
    /// Monthly income/expense trend.
    Monthly,
    /// Top categories ranked by volume.
    Top {
        /// Which side to rank: expense or income
        #[arg(long = "type", default_value = "expense")]
        transaction_type: String,
        #[arg(long, default_value = "5")]
        limit: usize,
    },
    /// Provider-invoice revenue analysis.
    Providers,
    /// Structurally invalid records, for data-quality review.
    Invalid,
}

#[derive(Subcommand)]
pub enum InvoicesCommands {
    /// Download the document behind a transaction and verify it.
    Fetch {
        /// Transaction id
        id: String,
        /// Merchant domain or URL that issued the invoice
        #[arg(long)]
        locator: String,
    },
}
