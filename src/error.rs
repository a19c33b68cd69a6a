use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can end a scan.
///
/// Quota probe failures never show up here: the rate limiter absorbs them
/// with a fixed backoff.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Please provide one or more CDN strings using the --search-strings option.")]
    MissingSearchStrings,

    #[error("GitHub token is required (pass --token or set GITHUB_TOKEN)")]
    MissingToken,

    #[error("invalid API base URL '{0}'")]
    InvalidApiUrl(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} from {url}: {message}")]
    Api {
        status: StatusCode,
        url: String,
        message: String,
    },

    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
