use clap::{Parser, ValueEnum};

use crate::config::{DEFAULT_API_URL, DEFAULT_ORG, DEFAULT_OUTPUT};

/// Output format for the identified assets report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Markdown table
    #[default]
    #[value(name = "md", alias = "markdown")]
    Markdown,
    /// Pretty printed JSON array
    Json,
}

/// Scan a GitHub organization for JavaScript assets loaded from a CDN.
#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Searches an organization's code for CDN strings, fetches every matching file \
                  and reports the JavaScript assets referenced by <script src> tags."
)]
pub struct Args {
    /// CDN strings to search for (for example a hostname fragment).
    #[clap(short, long = "search-strings", num_args = 1..)]
    pub search_strings: Vec<String>,

    /// Organization the code search is scoped to.
    #[clap(long, env = "CDN_SCAN_ORG", default_value = DEFAULT_ORG)]
    pub org: String,

    /// Report file path. Only written when at least one asset is found.
    #[clap(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: String,

    /// Report format.
    #[clap(long, value_enum, default_value_t = ReportFormat::Markdown)]
    pub format: ReportFormat,

    /// GitHub API token for authentication.
    #[clap(short, long)]
    pub token: Option<String>,

    /// Base URL of the GitHub REST API.
    #[clap(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Maximum number of pages to retrieve per search term.
    /// Each page contains up to 100 results.
    #[clap(short = 'p', long, value_name = "NUM")]
    pub max_pages: Option<u32>,

    /// Maximum number of concurrent API requests.
    #[clap(short = 'c', long, default_value = "8")]
    pub concurrency: usize,

    /// Hide progress bars.
    #[clap(short, long)]
    pub quiet: bool,
}
