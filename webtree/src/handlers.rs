use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use webtree_core::{OutputFormat, execute_crawl, render};
use webtree_scanner::options::{
    DEFAULT_BATCH_SIZE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TIME_LIMIT_SECS,
};
use webtree_scanner::{CrawlOptions, CrawlState, HeaderValues, Headers, ScheduleMode};

/// Crawled alongside the URL when no path list is given.
pub const DEFAULT_START_PATHS: [&str; 2] = ["robots.txt", "sitemap.xml"];

/// Parse `"name: value, name: value"`. Names are lowercased, both sides are
/// trimmed, and pairs missing either side are skipped. A repeated name keeps
/// every value.
pub fn parse_header_list(raw: &str) -> Headers {
    let mut headers = Headers::new();

    for pair in raw.split(',') {
        let Some((name, value)) = pair.split_once(':') else {
            continue;
        };

        let name = name.trim().to_lowercase();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }

        match headers.get_mut(&name) {
            Some(values) => values.push(value),
            None => {
                headers.insert(name, HeaderValues::from(value));
            }
        }
    }

    headers
}

/// Add the entries of a `"k=v; k2=v2"` cookie string after any `cookie`
/// values already in `headers`.
pub fn merge_cookies(headers: &mut Headers, cookies: &str) {
    for cookie in cookies.split(';').map(str::trim).filter(|c| !c.is_empty()) {
        match headers.get_mut("cookie") {
            Some(values) => values.push(cookie),
            None => {
                headers.insert("cookie".to_string(), HeaderValues::from(cookie));
            }
        }
    }
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Read newline-delimited start paths, or fall back to the defaults.
pub fn load_start_paths(path_list: Option<&str>) -> Result<Vec<String>> {
    let Some(path_list) = path_list else {
        return Ok(DEFAULT_START_PATHS.iter().map(|p| p.to_string()).collect());
    };

    let content = fs::read_to_string(expand_path(path_list))
        .map_err(|_| anyhow!("File not found: {}", path_list))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn build_options(args: &ArgMatches) -> Result<CrawlOptions> {
    let mut headers = args
        .get_one::<String>("headers")
        .map(|raw| parse_header_list(raw))
        .unwrap_or_default();

    if let Some(cookies) = args.get_one::<String>("cookies") {
        merge_cookies(&mut headers, cookies);
    }

    let start_paths = load_start_paths(args.get_one::<String>("path-list").map(String::as_str))?;

    let schedule = if args.get_flag("pool") {
        ScheduleMode::Pool
    } else {
        ScheduleMode::Wave
    };

    let request_timeout = args
        .get_one::<u64>("request-timeout")
        .map(|secs| Duration::from_secs(*secs))
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

    Ok(CrawlOptions::new()
        .with_batch_size(
            args.get_one::<usize>("batch-size")
                .copied()
                .unwrap_or(DEFAULT_BATCH_SIZE),
        )
        .with_time_limit(
            args.get_one::<u64>("time-limit")
                .copied()
                .unwrap_or(DEFAULT_TIME_LIMIT_SECS),
        )
        .with_headers(headers)
        .with_start_paths(start_paths)
        .with_request_timeout(request_timeout)
        .with_schedule(schedule)
        .with_verbose(args.get_flag("verbose")))
}

pub fn write_output(path: &Path, rendered: &str) -> Result<()> {
    fs::write(path, rendered)
        .with_context(|| format!("Failed to write tree to {}", path.display()))
}

pub async fn handle_crawl(args: &ArgMatches) -> Result<()> {
    let url = args
        .get_one::<String>("URL")
        .context("A URL to crawl is required")?;
    let quiet = args.get_flag("quiet");
    let verbose = args.get_flag("verbose");
    let format = args
        .get_one::<String>("format")
        .and_then(|format| OutputFormat::from_str(format))
        .unwrap_or_default();

    let options = build_options(args)?;
    info!("Crawl options: {:?}", options);

    let report = execute_crawl(url, options, !quiet && !verbose).await?;

    if report.summary.state == CrawlState::TimeExpired && !quiet {
        eprintln!(
            "{} Time limit reached after {} requests, the tree may be partial",
            "⚠".yellow().bold(),
            report.summary.visited
        );
    }

    let rendered = render(&report.tree, format);

    match args.get_one::<String>("out-file") {
        Some(out_file) => {
            write_output(&expand_path(out_file), &rendered)?;
            println!("{}", "Wrote tree to file!".green());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
