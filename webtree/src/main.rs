use colored::Colorize;
use tracing_subscriber::EnvFilter;
use webtree::commands::command_argument_builder;
use webtree::handlers::handle_crawl;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();

    init_tracing(matches.get_flag("verbose"));

    if let Err(e) = handle_crawl(&matches).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

// Logs go to stderr so stdout only ever carries the tree.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
