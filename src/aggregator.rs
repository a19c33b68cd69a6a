use futures::future::try_join_all;
use indicatif::ProgressBar;
use regex::Regex;
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::github::{ContentFetcher, SearchResultItem};
use crate::matcher::{extract, Asset};

/// Fetches each distinct file once and collects the assets it references.
///
/// The seen set lives for one run. Claiming a file key is a single
/// check-and-insert, so two results pointing at the same file never both
/// reach the fetcher, even when they are dispatched together.
pub struct ResultAggregator<'a> {
    fetcher: &'a dyn ContentFetcher,
    seen: Mutex<HashSet<String>>,
    progress: ProgressBar,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(fetcher: &'a dyn ContentFetcher) -> Self {
        ResultAggregator {
            fetcher,
            seen: Mutex::new(HashSet::new()),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-file progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Process all search results concurrently and concatenate their assets.
    ///
    /// Stops at the first fetch error.
    pub async fn process_all(
        &self,
        items: &[SearchResultItem],
        pattern: &Regex,
    ) -> Result<Vec<Asset>> {
        self.progress.set_length(items.len() as u64);

        let per_file = try_join_all(items.iter().map(|item| self.process_item(item, pattern)));
        let per_file = match per_file.await {
            Ok(per_file) => per_file,
            Err(e) => {
                self.progress.abandon_with_message("✗ Failed to process files");
                return Err(e);
            }
        };

        self.progress.finish_with_message("✓ Processed files");
        Ok(per_file.into_iter().flatten().collect())
    }

    /// Number of distinct files claimed so far.
    pub async fn seen_count(&self) -> usize {
        self.seen.lock().await.len()
    }

    async fn process_item(&self, item: &SearchResultItem, pattern: &Regex) -> Result<Vec<Asset>> {
        let key = item.file_key();
        let claimed = self.seen.lock().await.insert(key.clone());
        if !claimed {
            debug!("Skipping {}, already processed", key);
            self.progress.inc(1);
            return Ok(Vec::new());
        }

        self.progress.set_message(key.clone());
        let content = self
            .fetcher
            .fetch_raw(&item.owner_login, &item.repository_name, &item.path)
            .await?;
        let assets = extract(&content, pattern, &item.repository_name, &item.path);

        debug!("{} assets in {}", assets.len(), key);
        self.progress.inc(1);
        Ok(assets)
    }
}
