use clap::Parser;
use tracing::error;

use listings_cleaner::artifacts::build_store;
use listings_cleaner::cleaning::{CleaningArgs, CleaningStep};
use listings_cleaner::config::Config;
use listings_cleaner::observability::logging;

#[derive(Parser)]
#[command(name = "listings_cleaner")]
#[command(about = "Basic cleaning step for the NYC short-term rental listings pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Reference of the raw input artifact (name, name:latest or name:vN)
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// File name for the cleaned table, also the published artifact's name
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// Type tag recorded on the published artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// Description recorded on the published artifact
    #[arg(long = "output_description")]
    output_description: String,

    /// Minimum nightly price to keep, inclusive
    #[arg(long = "min_price")]
    min_price: f64,

    /// Maximum nightly price to keep, inclusive
    #[arg(long = "max_price")]
    max_price: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load_or_default()?;
    let store = build_store(&config)?;

    println!("🧹 Running basic cleaning step...");

    let args = CleaningArgs {
        input_artifact: cli.input_artifact,
        output_artifact: cli.output_artifact,
        output_type: cli.output_type,
        output_description: cli.output_description,
        min_price: cli.min_price,
        max_price: cli.max_price,
    };

    match CleaningStep::new(args).run(store, &config).await {
        Ok(summary) => {
            println!("\n📊 Cleaning results for {}:", summary.output_version.locator());
            println!("   Rows in: {}", summary.rows_in);
            println!("   Dropped by price band: {}", summary.dropped_price);
            println!("   Dropped duplicates: {}", summary.dropped_duplicates);
            println!("   Dropped outside service area: {}", summary.dropped_geo);
            println!("   Rows out: {}", summary.rows_out);
            println!("   Output file: {}", summary.output_file.display());
            println!(
                "✅ Published {} from {} (run {})",
                summary.output_version.locator(),
                summary.input_version.locator(),
                summary.run_id
            );
            Ok(())
        }
        Err(e) => {
            error!("Cleaning step failed: {}", e);
            println!("❌ Cleaning step failed: {}", e);
            Err(e.into())
        }
    }
}
