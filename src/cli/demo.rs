use colored::Colorize;

use crate::cli::load;
use crate::error::Result;
use crate::settings::get_data_dir;

// Deliberately messy: one provider invoice, one empty amount, one zero
// amount, one missing category, padded rows — the shapes real exports have.
const SAMPLE: &str = "\
\"Transaction ID,Date,Amount,Description,Reference,Category,Currency,Counterparty,Provider\"
\"TX001,2024-01-05,2500.00,Consulting payment,STRIPE-1001,Client Work,USD,Acme Corp,Stripe\"
\"TX002,2024-01-09,-49.00,Design software subscription,REF-2201,Software,USD,PixelTools,\"
\"TX003,2024-01-14,-820.00,Coworking rent January,REF-2202,Rent,USD,HubSpace,\"
\"TX004,2024-02-03,1800.00,Retainer payment,STRIPE-1002,Client Work,USD,Beta LLC,Stripe\"
\"TX005,2024-02-07,,Team lunch,REF-2203,Meals,USD,Cafe Nine,,,\"
\"TX006,2024-02-11,-130.75,Cloud hosting,REF-2204,Hosting,USD,Nimbus,\"
\"TX007,2024-02-19,0.00,Voided charge,REF-2205,Misc,USD,Nimbus,\"
\"TX008,2024-03-02,950.00,Hosting revenue,STRIPE-1003,Client Work,USD,Acme Corp,Stripe\"
\"TX009,2024-03-06,-42.10,Domain renewals,REF-2206,,USD,NameDesk,\"
\"TX010,2024-03-15,150.00,Office Supplies,REF123,Supplies,USD,VendorX,\"
";

pub fn run() -> Result<()> {
    let dir = get_data_dir();
    std::fs::create_dir_all(&dir)?;
    let sample_path = dir.join("demo-export.csv");
    std::fs::write(&sample_path, SAMPLE)?;

    println!("{} {}", "Wrote".green(), sample_path.display());
    load::run(&sample_path.to_string_lossy())?;
    println!();
    println!("Explore with `ivy list`, `ivy summary`, `ivy report monthly`.");
    Ok(())
}
