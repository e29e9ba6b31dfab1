use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 120;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64; rv:47.0) Gecko/20100101 Firefox/47.0";

/// Called with each URL as it is dispatched for fetching.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A header sent once, or once per value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValues::One(value) => vec![value.as_str()],
            HeaderValues::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn push(&mut self, value: impl Into<String>) {
        match self {
            HeaderValues::One(first) => {
                *self = HeaderValues::Many(vec![std::mem::take(first), value.into()]);
            }
            HeaderValues::Many(values) => values.push(value.into()),
        }
    }
}

impl From<&str> for HeaderValues {
    fn from(value: &str) -> Self {
        HeaderValues::One(value.to_string())
    }
}

impl From<Vec<String>> for HeaderValues {
    fn from(values: Vec<String>) -> Self {
        HeaderValues::Many(values)
    }
}

/// Static headers sent with every request, keyed by header name.
pub type Headers = BTreeMap<String, HeaderValues>;

/// How fetches are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleMode {
    /// Fixed batches awaited as a unit before the next batch starts.
    #[default]
    Wave,
    /// Always-saturated worker pool; idle workers wait for new URLs.
    Pool,
}

#[derive(Clone)]
pub struct CrawlOptions {
    /// Maximum number of fetches in flight at once.
    pub batch_size: usize,
    /// Paths crawled alongside the seed, resolved against its origin.
    pub start_paths: Vec<String>,
    /// Global budget. Only gates the start of new work.
    pub time_limit: Duration,
    pub headers: Headers,
    pub verbose: bool,
    /// Deadline for a single fetch, redirects included.
    pub request_timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    pub schedule: ScheduleMode,
    pub progress: Option<ProgressCallback>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            start_paths: Vec::new(),
            time_limit: Duration::from_secs(DEFAULT_TIME_LIMIT_SECS),
            headers: Headers::new(),
            verbose: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            schedule: ScheduleMode::Wave,
            progress: None,
        }
    }
}

impl fmt::Debug for CrawlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlOptions")
            .field("batch_size", &self.batch_size)
            .field("start_paths", &self.start_paths)
            .field("time_limit", &self.time_limit)
            .field("headers", &self.headers)
            .field("verbose", &self.verbose)
            .field("request_timeout", &self.request_timeout)
            .field("max_redirects", &self.max_redirects)
            .field("user_agent", &self.user_agent)
            .field("schedule", &self.schedule)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl CrawlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a loosely-typed options record. Missing, wrong-typed and
    /// non-positive fields fall back to their defaults; this never fails.
    ///
    /// Recognized keys: `batchSize`, `startPaths`, `timeLimit`, `headers`,
    /// `verbose`.
    pub fn from_value(value: &Value) -> Self {
        let mut options = Self::default();

        if let Some(batch_size) = value.get("batchSize").and_then(positive_integer) {
            options.batch_size = usize::try_from(batch_size).unwrap_or(DEFAULT_BATCH_SIZE);
        }

        if let Some(time_limit) = value.get("timeLimit").and_then(positive_integer) {
            options.time_limit = Duration::from_secs(time_limit);
        }

        if let Some(Value::Array(paths)) = value.get("startPaths") {
            let strings: Option<Vec<String>> = paths
                .iter()
                .map(|path| path.as_str().map(str::to_string))
                .collect();
            options.start_paths = strings.unwrap_or_default();
        }

        if let Some(headers) = value.get("headers") {
            options.headers = serde_json::from_value(headers.clone()).unwrap_or_default();
        }

        options.verbose = value
            .get("verbose")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        options
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size > 0 {
            batch_size
        } else {
            DEFAULT_BATCH_SIZE
        };
        self
    }

    pub fn with_time_limit(mut self, secs: u64) -> Self {
        self.time_limit = Duration::from_secs(if secs > 0 {
            secs
        } else {
            DEFAULT_TIME_LIMIT_SECS
        });
        self
    }

    pub fn with_start_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.start_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<HeaderValues>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.request_timeout = timeout;
        }
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleMode) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Build the request headers: the configured ones plus a default
    /// `user-agent` when none was supplied. Multiple cookie values are folded
    /// into one `cookie` header; other multi-valued headers repeat. Names and
    /// values that are not valid HTTP are skipped.
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();

        for (name, values) in &self.headers {
            let Ok(header_name) = HeaderName::from_bytes(name.trim().to_lowercase().as_bytes())
            else {
                warn!("Skipping header with invalid name {:?}", name);
                continue;
            };

            if header_name == COOKIE {
                let joined = values.values().join("; ");
                if let Some(value) = header_value(name, &joined) {
                    map.insert(header_name, value);
                }
                continue;
            }

            for value in values.values() {
                if let Some(value) = header_value(name, value) {
                    map.append(header_name.clone(), value);
                }
            }
        }

        if !map.contains_key(USER_AGENT) {
            if let Some(value) = header_value("user-agent", &self.user_agent) {
                map.insert(USER_AGENT, value);
            }
        }

        map
    }
}

fn header_value(name: &str, value: &str) -> Option<HeaderValue> {
    match HeaderValue::from_str(value.trim()) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Skipping invalid value {:?} for header {:?}", value, name);
            None
        }
    }
}

fn positive_integer(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return (n > 0).then_some(n);
    }

    let f = value.as_f64()?;
    (f > 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}
