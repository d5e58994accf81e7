use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tagscope_scanner::result::{CrawlSummary, PageStatus};
use tagscope_scanner::{Crawler, DEFAULT_MAX_PAGES, FetchConfig, HtmlSource, ScanError};
use tracing::info;
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub url: String,
    pub max_pages: usize,
    pub fetch: FetchConfig,
    pub seed_common_paths: bool,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_pages: DEFAULT_MAX_PAGES,
            fetch: FetchConfig::default(),
            seed_common_paths: true,
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Execute a crawl with the given options, fetching through the source the
/// options describe
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlSummary, ScanError> {
    let source = options.fetch.build_source()?;
    execute_crawl_with_source(options, source, progress_callback).await
}

/// Same as [`execute_crawl`] but with a caller-supplied HTML source
pub async fn execute_crawl_with_source(
    options: CrawlOptions,
    source: Arc<dyn HtmlSource>,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlSummary, ScanError> {
    let CrawlOptions {
        url,
        max_pages,
        seed_common_paths,
        show_progress_bars,
        ..
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));

    let pb_clone = progress_bar.clone();
    let count_clone = processed_count.clone();
    let outer_callback = progress_callback.clone();
    let internal_progress_callback: tagscope_scanner::ProgressCallback =
        Arc::new(move |index: usize, page_url: String| {
            count_clone.fetch_add(1, Ordering::Relaxed);
            if let Some(ref pb) = pb_clone {
                pb.set_message(format!("Analyzing page {}: {}", index + 1, page_url));
                pb.tick();
            }
            if let Some(ref callback) = outer_callback {
                callback(format!("[{}] {}", index + 1, page_url));
            }
        });

    let crawler = Crawler::new(source)
        .with_max_pages(max_pages)
        .with_common_paths(seed_common_paths)
        .with_progress_callback(internal_progress_callback);

    info!("Crawling {} (up to {} pages)", url, crawler.max_pages());
    let result = crawler.crawl(&url).await;

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        match result {
            Ok(_) => pb.finish_with_message(format!("Crawl complete! {} pages analyzed", total)),
            Err(_) => pb.abandon_with_message("Crawl failed"),
        }
    }

    if let Err(ref e) = result
        && let Some(ref callback) = progress_callback
    {
        callback(format!("[!]  Failed to crawl {}: {}", url, e));
    }

    result
}

/// Per-page listing of a crawl, one line per page
pub fn generate_crawl_report(summary: &CrawlSummary) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Pages analyzed: {}\n", summary.pages_analyzed));
    report.push_str(&format!("  With GTM: {}\n", summary.pages_with_gtm));
    report.push_str(&format!("  With GA4: {}\n", summary.pages_with_ga4));
    report.push_str(&format!("  Errors: {}\n", summary.pages_with_errors));
    report.push_str(&format!("  Coverage: {}%\n", summary.coverage_percent));

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    let host = Url::parse(&summary.start_url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| summary.start_url.clone());
    report.push_str(&format!("## {}\n", host));
    report.push_str(&format!("  {} pages analyzed\n\n", summary.pages_analyzed));

    for page in &summary.page_results {
        let path = extract_url_path(&page.url);

        // Green: tagged, yellow: inferred only, red: untracked or failed
        let marker = match page.status {
            PageStatus::Error => "\x1b[31m✗\x1b[0m",
            PageStatus::Success if page.is_untracked() => "\x1b[31m-\x1b[0m",
            PageStatus::Success if page.ga4_found && page.ga4_properties.is_empty() => {
                "\x1b[33m~\x1b[0m"
            }
            PageStatus::Success => "\x1b[32m✓\x1b[0m",
        };

        let mut line = format!("  {} {}", marker, path);

        let mut ids: Vec<&str> = page.gtm_containers.iter().map(|s| s.as_str()).collect();
        ids.extend(page.ga4_properties.iter().map(|s| s.as_str()));
        if !ids.is_empty() {
            line.push_str(&format!(" \x1b[90m{}\x1b[0m", ids.join(" ")));
        }
        if let Some(ref error) = page.error {
            line.push_str(&format!(" \x1b[90m{}\x1b[0m", error));
        }

        report.push_str(&line);
        report.push('\n');
    }
    report.push('\n');

    report
}
