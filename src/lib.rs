//! # CDN Asset Scanner
//!
//! Finds the JavaScript assets an organization loads from a CDN. Every file
//! that GitHub code search returns for a CDN string is fetched once and
//! scanned for `<script src="...">` tags. The results are reported as a
//! markdown table.
//!
//! ## Main Components
//!
//! - [`AssetScanner`]: runs searches for all terms and collects the assets
//! - [`GitHubClient`]: rate limited code search and raw content retrieval
//! - [`ResultAggregator`]: processes each distinct file once
//! - [`matcher::extract`]: line-by-line script tag extraction
//! - [`report::to_markdown_table`]: report rendering
//!
//! ## Example
//!
//! ```no_run
//! use cdn_asset_scanner::{AssetScanner, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ScanConfig::new("https://api.github.com", "ghp_example")?;
//!     let scanner = AssetScanner::new(config)?;
//!
//!     let assets = scanner.run(&["cdn.example.com".to_string()]).await?;
//!     scanner.write_report(&assets).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod aggregator;
mod args;
pub mod config;
pub mod error;
pub mod github;
pub mod matcher;
pub mod rate_limit;
pub mod report;
mod scanner;

pub use crate::aggregator::ResultAggregator;
pub use crate::args::{Args, ReportFormat};
pub use crate::config::ScanConfig;
pub use crate::error::{Result, ScanError};
pub use crate::github::{ContentFetcher, GitHubClient, SearchPage, SearchResultItem};
pub use crate::matcher::Asset;
pub use crate::scanner::AssetScanner;
