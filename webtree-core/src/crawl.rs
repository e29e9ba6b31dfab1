use crate::render::{OutputFormat, render};
use crate::tree::WebTree;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;
use webtree_scanner::{CrawlError, CrawlOptions, CrawlSummary, Crawler};

/// The tree a crawl produced plus how the crawl went.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub tree: WebTree,
    pub summary: CrawlSummary,
}

/// Crawl `seed` and return the resulting tree.
pub async fn crawl(seed: &str, options: CrawlOptions) -> Result<WebTree, CrawlError> {
    execute_crawl(seed, options, false)
        .await
        .map(|report| report.tree)
}

/// Crawl `seed` and render the resulting tree.
pub async fn crawl_to_string(
    seed: &str,
    options: CrawlOptions,
    format: OutputFormat,
) -> Result<String, CrawlError> {
    let tree = crawl(seed, options).await?;
    Ok(render(&tree, format))
}

/// Execute a crawl, optionally showing a spinner with the number of URLs
/// dispatched so far. Any progress callback already set on `options` is still
/// called.
pub async fn execute_crawl(
    seed: &str,
    mut options: CrawlOptions,
    show_progress_bar: bool,
) -> Result<CrawlReport, CrawlError> {
    let progress_bar = if show_progress_bar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Starting crawl...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        let count_clone = processed_count.clone();
        let inner = options.progress.take();

        options = options.with_progress_callback(Arc::new(move |url: &str| {
            let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            pb_clone.set_message(format!("Crawling... {} URLs dispatched ({})", count, url));
            if let Some(ref inner) = inner {
                inner(url);
            }
        }));
    }

    let crawler = Crawler::new(options)?;
    let mut tree = WebTree::new();
    let result = crawler.crawl(seed, &mut tree).await;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    let summary = result?;
    debug!("Tree holds {} URLs after {:?} crawl", tree.len(), summary.state);
    Ok(CrawlReport { tree, summary })
}
