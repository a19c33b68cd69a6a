use futures::future::{try_join_all, BoxFuture};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::rate_limit::{Clock, Quota, QuotaProbe, RateLimiter, SystemClock};

pub const PER_PAGE: u32 = 100;
const TEXT_MATCH_ACCEPT: &str = "application/vnd.github.v3.text-match+json";
const RAW_ACCEPT: &str = "application/vnd.github.v3.raw";
const JSON_ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("cdn-asset-scanner/", env!("CARGO_PKG_VERSION"));

/// A file returned by code search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultItem {
    pub owner_login: String,
    pub repository_name: String,
    pub path: String,
}

impl SearchResultItem {
    /// Identity used to process each file once per run: `repository/path`.
    pub fn file_key(&self) -> String {
        format!("{}/{}", self.repository_name, self.path)
    }
}

/// One page of code search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub total_count: u64,
    pub items: Vec<SearchResultItem>,
}

#[derive(Deserialize)]
struct SearchResponse {
    total_count: u64,
    #[serde(default)]
    items: Vec<RawSearchItem>,
}

#[derive(Deserialize)]
struct RawSearchItem {
    path: String,
    repository: RawRepository,
}

#[derive(Deserialize)]
struct RawRepository {
    name: String,
    owner: RawOwner,
}

#[derive(Deserialize)]
struct RawOwner {
    login: String,
}

impl From<RawSearchItem> for SearchResultItem {
    fn from(raw: RawSearchItem) -> Self {
        SearchResultItem {
            owner_login: raw.repository.owner.login,
            repository_name: raw.repository.name,
            path: raw.path,
        }
    }
}

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Deserialize)]
struct RateLimitResources {
    core: Quota,
}

/// Retrieves raw file bodies from a repository.
pub trait ContentFetcher: Send + Sync {
    fn fetch_raw<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, Result<String>>;
}

/// GitHub REST client scoped to a single organization.
///
/// Every search and content request waits on the rate limiter first, and no
/// more than `concurrency` requests are in flight at once.
pub struct GitHubClient {
    client: Client,
    token: String,
    api_url: Url,
    org: String,
    max_pages: Option<u32>,
    permits: Semaphore,
    limiter: RateLimiter,
}

impl GitHubClient {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        GitHubClient::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client whose rate limiter runs on the given clock.
    pub fn with_clock(config: &ScanConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(GitHubClient {
            client,
            token: config.token.clone(),
            api_url: config.api_url.clone(),
            org: config.org.clone(),
            max_pages: config.max_pages,
            permits: Semaphore::new(config.concurrency.max(1)),
            limiter: RateLimiter::new(clock),
        })
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Fetch one page of search results for `term` within the organization.
    pub async fn search_code(&self, term: &str, page: u32) -> Result<SearchPage> {
        self.limiter.ensure_capacity(self).await;

        let url = self.endpoint(&["search", "code"]);
        let query = format!("{} org:{}", term, self.org);
        let per_page = PER_PAGE.to_string();
        let page_str = page.to_string();

        debug!("Requesting URL: {} (q={}, page={})", url, query, page);
        let request = self.request(url.clone(), TEXT_MATCH_ACCEPT).query(&[
            ("q", query.as_str()),
            ("per_page", per_page.as_str()),
            ("page", page_str.as_str()),
        ]);
        let response = self.send(request).await?;

        // Past the searchable result window. On page 1 a 422 means the query
        // or organization was rejected, which is an error.
        if page > 1 && response.status == StatusCode::UNPROCESSABLE_ENTITY {
            warn!("Reached search limit for '{}' at page {}", term, page);
            return Ok(SearchPage::default());
        }

        let body = response.into_body(&url)?;
        let parsed: SearchResponse = serde_json::from_slice(&body)?;

        Ok(SearchPage {
            total_count: parsed.total_count,
            items: parsed.items.into_iter().map(SearchResultItem::from).collect(),
        })
    }

    /// Fetch every page of results for `term`.
    ///
    /// Page 1 tells us the total; the remaining pages are requested concurrently.
    pub async fn search_all(&self, term: &str) -> Result<Vec<SearchResultItem>> {
        let first = self.search_code(term, 1).await?;
        info!("{} potential matches found with {}", first.total_count, term);

        let pages = page_count(first.total_count, self.max_pages);
        if let Some(max_page) = self.max_pages {
            if total_pages(first.total_count) > max_page {
                info!(
                    "Max page limit reached for '{}' (limit: {})",
                    term, max_page
                );
            }
        }

        let mut items = first.items;
        let rest = try_join_all((2..=pages).map(|page| self.search_code(term, page))).await?;
        for page in rest {
            items.extend(page.items);
        }

        debug!("Collected {} results for '{}'", items.len(), term);
        Ok(items)
    }

    /// Query the core quota. Not rate limited itself.
    pub async fn fetch_quota(&self) -> Result<Quota> {
        let url = self.endpoint(&["rate_limit"]);
        let body = self
            .send(self.request(url.clone(), JSON_ACCEPT))
            .await?
            .into_body(&url)?;
        let parsed: RateLimitResponse = serde_json::from_slice(&body)?;
        Ok(parsed.resources.core)
    }

    async fn raw_content(&self, owner: &str, repo: &str, path: &str) -> Result<String> {
        self.limiter.ensure_capacity(self).await;

        let mut segments = vec!["repos", owner, repo, "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        let url = self.endpoint(&segments);

        debug!("Fetching {}/{}/{}", owner, repo, path);
        let body = self
            .send(self.request(url.clone(), RAW_ACCEPT))
            .await?
            .into_body(&url)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        // Base URLs are validated by ScanConfig, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, url: Url, accept: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header("Accept", accept)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Send `request` and read the whole body. The request permit is held
    /// until the body has been received.
    async fn send(&self, request: RequestBuilder) -> Result<ApiResponse> {
        // The semaphore is never closed
        let _permit = self.permits.acquire().await.ok();
        let response = request.send().await?;
        self.limiter.observe(response.headers()).await;

        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

impl QuotaProbe for GitHubClient {
    fn quota(&self) -> BoxFuture<'_, Result<Quota>> {
        Box::pin(self.fetch_quota())
    }
}

impl ContentFetcher for GitHubClient {
    fn fetch_raw<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.raw_content(owner, repo, path))
    }
}

/// `ceil(total / 100)`
pub fn total_pages(total_count: u64) -> u32 {
    u32::try_from(total_count.div_ceil(u64::from(PER_PAGE))).unwrap_or(u32::MAX)
}

/// Number of pages to request, honouring an optional cap. At least one page
/// has always been fetched to learn the total.
pub fn page_count(total_count: u64, max_pages: Option<u32>) -> u32 {
    let pages = total_pages(total_count);
    match max_pages {
        Some(max) => pages.min(max),
        None => pages,
    }
}

/// A fully read API response.
struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    /// The body of a successful response, or the API error it describes.
    fn into_body(self, url: &Url) -> Result<Vec<u8>> {
        if self.status.is_success() {
            return Ok(self.body);
        }

        let text = String::from_utf8_lossy(&self.body).into_owned();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(text);

        Err(ScanError::Api {
            status: self.status,
            url: url.to_string(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, None), 0);
        assert_eq!(page_count(1, None), 1);
        assert_eq!(page_count(100, None), 1);
        assert_eq!(page_count(101, None), 2);
        assert_eq!(page_count(250, None), 3);
    }

    #[test]
    fn page_count_honours_cap() {
        assert_eq!(page_count(950, Some(3)), 3);
        assert_eq!(page_count(150, Some(5)), 2);
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let mut config = ScanConfig::new("https://ghe.example.com/api/v3/", "token").unwrap();
        config.org = "acme".into();
        let client = GitHubClient::new(&config).unwrap();

        let url = client.endpoint(&["repos", "acme", "web", "contents", "views", "my page.html"]);
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/acme/web/contents/views/my%20page.html"
        );
        assert_eq!(
            client.endpoint(&["rate_limit"]).as_str(),
            "https://ghe.example.com/api/v3/rate_limit"
        );
    }

    #[test]
    fn search_response_maps_to_items() {
        let body = r#"{
            "total_count": 1,
            "incomplete_results": false,
            "items": [{
                "name": "index.html",
                "path": "assets/index.html",
                "sha": "abc",
                "repository": {"name": "ch-service", "owner": {"login": "companieshouse"}},
                "text_matches": []
            }]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        let items: Vec<SearchResultItem> = parsed.items.into_iter().map(Into::into).collect();

        assert_eq!(
            items,
            vec![SearchResultItem {
                owner_login: "companieshouse".into(),
                repository_name: "ch-service".into(),
                path: "assets/index.html".into(),
            }]
        );
        assert_eq!(items[0].file_key(), "ch-service/assets/index.html");
    }
}
