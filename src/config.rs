use std::env;
use std::path::PathBuf;

use reqwest::Url;
use tracing::error;

use crate::args::{Args, ReportFormat};
use crate::error::{Result, ScanError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_ORG: &str = "companieshouse";
pub const DEFAULT_OUTPUT: &str = "identified_assets.md";
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Fully resolved settings for one scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub api_url: Url,
    pub token: String,
    pub org: String,
    pub output: PathBuf,
    pub format: ReportFormat,
    pub max_pages: Option<u32>,
    pub concurrency: usize,
    pub show_progress: bool,
}

impl ScanConfig {
    /// Build a config with defaults for everything but the endpoint and token.
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ScanError::MissingToken);
        }

        Ok(ScanConfig {
            api_url: parse_api_url(api_url)?,
            token,
            org: DEFAULT_ORG.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            format: ReportFormat::default(),
            max_pages: None,
            concurrency: DEFAULT_CONCURRENCY,
            show_progress: false,
        })
    }

    /// Resolve command line arguments, falling back to `GITHUB_TOKEN` for the token.
    pub fn from_args(args: &Args) -> Result<Self> {
        let token = match &args.token {
            Some(t) if !t.trim().is_empty() => t.clone(),
            _ => match env::var("GITHUB_TOKEN") {
                Ok(token) if !token.trim().is_empty() => token,
                _ => {
                    error!("GitHub token not provided or found in environment");
                    return Err(ScanError::MissingToken);
                }
            },
        };

        let mut config = ScanConfig::new(&args.api_url, token)?;
        config.org = args.org.clone();
        config.output = PathBuf::from(&args.output);
        config.format = args.format;
        config.max_pages = args.max_pages;
        config.concurrency = args.concurrency.max(1);
        config.show_progress = !args.quiet;
        Ok(config)
    }
}

fn parse_api_url(raw: &str) -> Result<Url> {
    match Url::parse(raw.trim()) {
        Ok(url) if !url.cannot_be_a_base() => Ok(url),
        _ => Err(ScanError::InvalidApiUrl(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn from_args_prefers_explicit_token() {
        let args = Args::parse_from([
            "cdn-asset-scanner",
            "--search-strings",
            "cdn.example.com",
            "--token",
            "abc123",
            "--org",
            "acme",
            "--format",
            "json",
            "-c",
            "0",
            "-q",
        ]);

        let config = ScanConfig::from_args(&args).unwrap();
        assert_eq!(config.token, "abc123");
        assert_eq!(config.org, "acme");
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(config.concurrency, 1);
        assert!(!config.show_progress);
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn new_rejects_blank_token() {
        assert!(matches!(
            ScanConfig::new(DEFAULT_API_URL, "  "),
            Err(ScanError::MissingToken)
        ));
    }

    #[test]
    fn new_rejects_non_base_url() {
        assert!(matches!(
            ScanConfig::new("mailto:someone@example.com", "token"),
            Err(ScanError::InvalidApiUrl(_))
        ));
        assert!(matches!(
            ScanConfig::new("not a url", "token"),
            Err(ScanError::InvalidApiUrl(_))
        ));
    }

    #[test]
    fn search_strings_accept_multiple_values() {
        let args = Args::parse_from([
            "cdn-asset-scanner",
            "-s",
            "cdn.one.example",
            "cdn.two.example",
        ]);
        assert_eq!(args.search_strings, vec!["cdn.one.example", "cdn.two.example"]);
        assert_eq!(args.format, ReportFormat::Markdown);
    }
}
