use crate::CLAP_STYLING;
use clap::{arg, command};

pub fn command_argument_builder() -> clap::Command {
    command!("webtree")
        .bin_name("webtree")
        .about("Crawl a website and print its subdomains and paths as a tree")
        .styles(CLAP_STYLING)
        .arg(
            arg!(<URL>)
                .help("The URL to start crawling from, scheme included")
                .env("WEBTREE_URL"),
        )
        .arg(
            arg!(-b --"batch-size" <NUM_REQUESTS>)
                .required(false)
                .help("Maximum number of requests in flight at once")
                .value_parser(clap::value_parser!(usize))
                .env("WEBTREE_BATCH_SIZE")
                .default_value("200"),
        )
        .arg(
            arg!(-t --"time-limit" <SECONDS>)
                .required(false)
                .help("Stop starting new requests after this many seconds")
                .value_parser(clap::value_parser!(u64))
                .env("WEBTREE_TIME_LIMIT")
                .default_value("120"),
        )
        .arg(
            arg!(-H --"headers" <HEADERS>)
                .required(false)
                .help("Extra request headers, e.g. \"x-token: abc, accept: */*\"")
                .env("WEBTREE_HEADERS"),
        )
        .arg(
            arg!(-c --"cookies" <COOKIES>)
                .required(false)
                .help("Cookies sent with every request, e.g. \"session=abc; theme=dark\"")
                .env("WEBTREE_COOKIES"),
        )
        .arg(
            arg!(-p --"path-list" <PATH>)
                .required(false)
                .help("Newline-delimited paths to crawl alongside the URL (default: robots.txt, sitemap.xml)")
                .env("WEBTREE_PATH_LIST"),
        )
        .arg(
            arg!(-o --"out-file" <PATH>)
                .required(false)
                .help("Write the tree to a file instead of stdout")
                .env("WEBTREE_OUT_FILE"),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Output format")
                .value_parser(["string", "html", "json"])
                .env("WEBTREE_FORMAT")
                .default_value("string"),
        )
        .arg(
            arg!(--"request-timeout" <SECONDS>)
                .required(false)
                .help("Timeout for a single request, redirects included")
                .value_parser(clap::value_parser!(u64))
                .env("WEBTREE_REQUEST_TIMEOUT")
                .default_value("3"),
        )
        .arg(
            arg!(--"pool")
                .required(false)
                .help("Keep every worker busy instead of crawling in fixed batches")
                .env("WEBTREE_POOL")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-v --"verbose")
                .required(false)
                .help("Log every request and failure")
                .env("WEBTREE_VERBOSE")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-q --"quiet")
                .required(false)
                .help("Suppress the progress spinner and non-essential output")
                .action(clap::ArgAction::SetTrue),
        )
}
