use crate::error::{CrawlError, Result};
use crate::extract::{LinkSource, extract_links};
use crate::fetch::{Fetch, HttpFetcher};
use crate::normalize::{self, normalize_url, resolve_relative};
use crate::options::{CrawlOptions, ScheduleMode};
use futures::future::join_all;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Receives every successfully visited URL.
///
/// `set` must be idempotent: recording the same URL twice leaves the map as
/// if it had been recorded once.
pub trait SiteMap {
    fn set(&mut self, url: &str);
}

/// How a crawl ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Running,
    /// The time limit fired before the frontier drained.
    TimeExpired,
    /// No URLs were left to visit.
    Drained,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub state: CrawlState,
    /// URLs whose fetch attempt completed, successfully or not.
    pub visited: usize,
    /// URLs written into the site map.
    pub written: usize,
    pub failed: usize,
    /// Frontier entries dropped when the crawl stopped.
    pub discarded: usize,
}

/// State owned by a single crawl invocation.
struct CrawlRun {
    frontier: VecDeque<String>,
    /// Everything queued, in flight or visited. Guards against re-enqueueing.
    seen: HashSet<String>,
    visited: HashSet<String>,
    deadline: Instant,
    state: CrawlState,
    written: usize,
    failed: usize,
    verbose: bool,
}

impl CrawlRun {
    fn new(seed: &Url, options: &CrawlOptions) -> Self {
        let mut run = Self {
            frontier: VecDeque::new(),
            seen: HashSet::new(),
            visited: HashSet::new(),
            deadline: Instant::now() + options.time_limit,
            state: CrawlState::Running,
            written: 0,
            failed: 0,
            verbose: options.verbose,
        };

        run.enqueue(normalize_url(seed));
        for path in &options.start_paths {
            if let Some(url) = resolve_relative(seed, path) {
                run.enqueue(url);
            }
        }

        run
    }

    fn enqueue(&mut self, url: String) -> bool {
        if self.seen.insert(url.clone()) {
            self.frontier.push_back(url);
            true
        } else {
            false
        }
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn next_wave(&mut self, batch_size: usize) -> Vec<String> {
        let take = batch_size.min(self.frontier.len());
        self.frontier.drain(..take).collect()
    }

    /// Record the outcome of one visit. Returns how many new URLs were queued.
    fn settle<T: SiteMap>(
        &mut self,
        url: String,
        outcome: Result<Vec<String>>,
        tree: &mut T,
    ) -> usize {
        let mut queued = 0;

        match outcome {
            Ok(links) => {
                if self.verbose {
                    info!("Visited \"{}\"", url);
                } else {
                    debug!("Visited \"{}\"", url);
                }

                tree.set(&url);
                self.written += 1;

                for link in links {
                    if self.enqueue(link) {
                        queued += 1;
                    }
                }
            }
            Err(e) => {
                if self.verbose {
                    warn!("{}", e);
                } else {
                    debug!("{}", e);
                }
                self.failed += 1;
            }
        }

        self.visited.insert(url);
        queued
    }

    fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            state: self.state,
            visited: self.visited.len(),
            written: self.written,
            failed: self.failed,
            discarded: self.frontier.len(),
        }
    }
}

/// Shared state for pool mode.
struct Pool<'t, T> {
    shared: Mutex<(CrawlRun, &'t mut T)>,
    notify: Notify,
    waiting: AtomicUsize,
    done: AtomicBool,
    workers: usize,
}

impl<T> Pool<'_, T> {
    fn finish(&self) {
        self.done.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}

pub struct Crawler<F = HttpFetcher> {
    fetcher: F,
    options: CrawlOptions,
}

impl Crawler<HttpFetcher> {
    pub fn new(options: CrawlOptions) -> Result<Self> {
        let fetcher = HttpFetcher::new(&options)?;
        Ok(Self { fetcher, options })
    }
}

impl<F: Fetch> Crawler<F> {
    pub fn with_fetcher(fetcher: F, options: CrawlOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Crawl outward from `seed`, writing every successfully fetched
    /// same-domain URL into `tree`.
    ///
    /// Only an unparseable seed is an error. Per-URL failures are logged and
    /// leave that URL out of the tree.
    pub async fn crawl<T: SiteMap>(&self, seed: &str, tree: &mut T) -> Result<CrawlSummary> {
        let seed = normalize::parse(seed)?;
        let hostname = seed
            .host_str()
            .ok_or_else(|| CrawlError::InvalidUrl(seed.to_string()))?
            .to_string();

        info!(
            "Crawling \"{}\" for <= {} seconds",
            hostname,
            self.options.time_limit.as_secs()
        );

        let mut run = CrawlRun::new(&seed, &self.options);

        let run = match self.options.schedule {
            ScheduleMode::Wave => {
                self.run_waves(&mut run, &hostname, tree).await;
                run
            }
            ScheduleMode::Pool => self.run_pool(run, &hostname, tree).await,
        };

        let summary = run.summary();
        info!(
            "Visited {} URLs ({} mapped, {} failed)",
            summary.visited, summary.written, summary.failed
        );

        Ok(summary)
    }

    /// Fetch one URL and pull the same-domain links out of it.
    async fn visit(&self, url: &str, hostname: &str) -> Result<Vec<String>> {
        if let Some(ref callback) = self.options.progress {
            callback(url);
        }

        let source_url = Url::parse(url).map_err(|_| CrawlError::InvalidUrl(url.to_string()))?;
        let page = self.fetcher.fetch(url).await?;

        Ok(extract_links(&LinkSource {
            body: &page.body,
            headers: &page.headers,
            hostname,
            source_url: &source_url,
        }))
    }

    async fn run_waves<T: SiteMap>(&self, run: &mut CrawlRun, hostname: &str, tree: &mut T) {
        loop {
            if run.frontier.is_empty() {
                debug!("Ran out of URLs");
                run.state = CrawlState::Drained;
                return;
            }

            if run.expired() {
                info!("Reached time limit, finishing up...");
                run.state = CrawlState::TimeExpired;
                return;
            }

            let wave = run.next_wave(self.options.batch_size);
            debug!("Dispatching wave of {} URLs", wave.len());

            let outcomes = join_all(wave.iter().map(|url| self.visit(url, hostname))).await;

            for (url, outcome) in wave.into_iter().zip(outcomes) {
                run.settle(url, outcome, tree);
            }
        }
    }

    async fn run_pool<T: SiteMap>(&self, run: CrawlRun, hostname: &str, tree: &mut T) -> CrawlRun {
        let deadline = run.deadline;
        let pool = Pool {
            shared: Mutex::new((run, tree)),
            notify: Notify::new(),
            waiting: AtomicUsize::new(0),
            done: AtomicBool::new(false),
            workers: self.options.batch_size.max(1),
        };

        let expired = {
            let workers =
                join_all((0..pool.workers).map(|id| self.pool_worker(id, &pool, hostname)));
            tokio::pin!(workers);

            tokio::select! {
                _ = &mut workers => false,
                _ = tokio::time::sleep_until(deadline) => {
                    info!("Reached time limit, finishing up...");
                    pool.finish();
                    workers.await;
                    true
                }
            }
        };

        let (mut run, _) = pool.shared.into_inner();
        run.state = if expired {
            CrawlState::TimeExpired
        } else {
            CrawlState::Drained
        };
        run
    }

    async fn pool_worker<T: SiteMap>(&self, id: usize, pool: &Pool<'_, T>, hostname: &str) {
        loop {
            if pool.done.load(Ordering::Acquire) {
                return;
            }

            // Registered before the queue is checked so a push between the
            // check and the wait still wakes this worker.
            let notified = pool.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next = pool.shared.lock().await.0.frontier.pop_front();

            let Some(url) = next else {
                if pool.waiting.fetch_add(1, Ordering::AcqRel) + 1 == pool.workers {
                    debug!("Worker {} found every worker idle, ran out of URLs", id);
                    pool.finish();
                    return;
                }

                notified.await;
                pool.waiting.fetch_sub(1, Ordering::AcqRel);
                continue;
            };

            let outcome = self.visit(&url, hostname).await;

            let queued = {
                let mut shared = pool.shared.lock().await;
                let (run, tree) = &mut *shared;
                run.settle(url, outcome, &mut **tree)
            };

            if queued > 0 {
                pool.notify.notify_waiters();
            }
        }
    }
}
