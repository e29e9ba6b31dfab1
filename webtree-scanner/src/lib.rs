pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod options;

pub use crawler::{CrawlState, CrawlSummary, Crawler, SiteMap};
pub use error::{CrawlError, Result};
pub use fetch::{Fetch, HttpFetcher, Page};
pub use options::{CrawlOptions, HeaderValues, Headers, ProgressCallback, ScheduleMode};
