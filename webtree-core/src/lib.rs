pub mod crawl;
pub mod render;
pub mod tree;

pub use crawl::{CrawlReport, crawl, crawl_to_string, execute_crawl};
pub use render::{OutputFormat, render};
pub use tree::{Node, WebTree};
