// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    fetch_config_from_args, load_audit_from_file, load_urls_from_file, load_urls_from_source,
    parse_url_line,
};

// Re-export crawl functionality from tagscope-core
pub use tagscope_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path, generate_crawl_report,
};
