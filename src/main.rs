mod aggregator;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod intent;
mod invoices;
mod models;
mod normalizer;
mod pipeline;
mod query;
mod settings;

use clap::Parser;

use cli::{Cli, Commands, InvoicesCommands, ReportCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Load { file } => cli::load::run(&file),
        Commands::List { limit } => cli::list::run(limit),
        Commands::Get { id } => cli::get::run(&id),
        Commands::Summary {
            category,
            provider,
            from_date,
            to_date,
            clean,
        } => cli::summary::run(category, provider, from_date, to_date, clean),
        Commands::Report { command } => match command {
            ReportCommands::Categories => cli::report::categories(),
            ReportCommands::Monthly => cli::report::monthly(),
            ReportCommands::Top {
                transaction_type,
                limit,
            } => cli::report::top(&transaction_type, limit),
            ReportCommands::Providers => cli::report::providers(),
            ReportCommands::Invalid => cli::report::invalid(),
        },
        Commands::Ask { question } => cli::ask::run(&question),
        Commands::Invoices { command } => match command {
            InvoicesCommands::Fetch { id, locator } => cli::invoices::fetch(&id, &locator),
        },
        Commands::Status => cli::status::run(),
        Commands::Demo => cli::demo::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
