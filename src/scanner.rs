use futures::future::try_join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info};

use crate::aggregator::ResultAggregator;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::github::{GitHubClient, SearchResultItem};
use crate::matcher::{Asset, SCRIPT_SRC_RE};
use crate::rate_limit::Clock;
use crate::report;

/// Runs a full scan: search every term, process each distinct file once and
/// write the report.
pub struct AssetScanner {
    client: GitHubClient,
    config: ScanConfig,
    progress: MultiProgress,
}

impl AssetScanner {
    /// Create a new AssetScanner instance
    pub fn new(config: ScanConfig) -> Result<Self> {
        let client = GitHubClient::new(&config)?;
        Ok(AssetScanner::with_client(config, client))
    }

    /// Create a scanner whose rate limiter sleeps on `clock`.
    pub fn with_clock(config: ScanConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = GitHubClient::with_clock(&config, clock)?;
        Ok(AssetScanner::with_client(config, client))
    }

    fn with_client(config: ScanConfig, client: GitHubClient) -> Self {
        let progress = if config.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        AssetScanner {
            client,
            config,
            progress,
        }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    /// Search all terms concurrently, then process the combined results once
    /// so a file found by several terms is only reported once.
    pub async fn run(&self, search_terms: &[String]) -> Result<Vec<Asset>> {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

        let searches = search_terms.iter().map(|term| {
            let pb = self.progress.add(ProgressBar::new_spinner());
            pb.set_style(spinner_style.clone());
            pb.set_message(format!("Searching '{}' in {}", term, self.client.org()));
            pb.enable_steady_tick(Duration::from_millis(80));

            async move {
                let result = self.client.search_all(term).await;
                match &result {
                    Ok(items) => pb.finish_with_message(format!(
                        "✓ {} results for '{}'",
                        items.len(),
                        term
                    )),
                    Err(e) => {
                        error!("Search for '{}' failed: {}", term, e);
                        pb.abandon_with_message(format!("✗ Failed '{}'", term));
                    }
                }
                result
            }
        });

        let items: Vec<SearchResultItem> = try_join_all(searches)
            .await?
            .into_iter()
            .flatten()
            .collect();
        info!(
            "{} search results across {} search strings",
            items.len(),
            search_terms.len()
        );

        let files_pb = self.progress.add(ProgressBar::new(items.len() as u64));
        files_pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        let aggregator = ResultAggregator::new(&self.client).with_progress(files_pb);
        let assets = aggregator.process_all(&items, &SCRIPT_SRC_RE).await?;

        info!(
            "Identified {} assets in {} files",
            assets.len(),
            aggregator.seen_count().await
        );
        Ok(assets)
    }

    /// Write the report if any assets were found. Returns whether a file was written.
    pub async fn write_report(&self, assets: &[Asset]) -> Result<bool> {
        if assets.is_empty() {
            return Ok(false);
        }

        report::write_report(&self.config.output, assets, self.config.format).await?;
        Ok(true)
    }
}
