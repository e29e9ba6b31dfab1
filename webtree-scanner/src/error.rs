use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request timeout: {0}")]
    RequestTimeout(String),

    #[error("Failed redirect: {0}")]
    FailedRedirect(String),

    #[error("Status code: {code} ({url})")]
    StatusError { url: String, code: u16 },

    #[error("Too many redirects (limit {limit}): {url}")]
    TooManyRedirects { url: String, limit: usize },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
