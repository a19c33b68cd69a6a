use cdn_asset_scanner::{Args, AssetScanner, ScanConfig, ScanError};
use clap::Parser;
use dotenv::dotenv;
use std::error::Error;
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize the tracing logger
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    dotenv().ok();

    let args = Args::parse();

    let search_terms: Vec<String> = args
        .search_strings
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if search_terms.is_empty() {
        error!("{}", ScanError::MissingSearchStrings);
        process::exit(1);
    }

    let config = ScanConfig::from_args(&args)?;
    let output = config.output.clone();
    let scanner = AssetScanner::new(config)?;

    let assets = match scanner.run(&search_terms).await {
        Ok(assets) => assets,
        Err(e) => {
            error!("Scan failed: {}", e);
            return Err(e.into());
        }
    };

    if scanner.write_report(&assets).await? {
        info!("Report has been saved to {}", output.display());
    } else {
        info!("No assets identified; no report written");
    }

    Ok(())
}
