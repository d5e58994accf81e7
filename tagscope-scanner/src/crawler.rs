use crate::detect::{Link, PageScan, scan_page};
use crate::error::{Result, ScanError};
use crate::normalize::{is_homepage, is_same_host, is_skipped_resource, join_path, normalize_url};
use crate::result::{CrawlSummary, PageResult};
use crate::source::HtmlSource;
use crate::summary::build_summary;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

pub const DEFAULT_MAX_PAGES: usize = 10;
pub const MAX_PAGES_LIMIT: usize = 50;
/// New links accepted from a single page
pub const MAX_LINKS_PER_PAGE: usize = 25;
/// Discovery stops once this many URLs are waiting; dequeuing carries on
pub const QUEUE_SOFT_CAP: usize = 200;

/// Seeded alongside a homepage start URL
pub const COMMON_PATHS: &[&str] = &[
    "/about",
    "/contact",
    "/services",
    "/products",
    "/blog",
    "/pricing",
];

/// Injected when an early page yields almost no links (JS-only navigation)
const FALLBACK_PATHS: &[&str] = &[
    "/about", "/contact", "/services", "/products", "/blog", "/pricing", "/faq", "/team", "/shop",
    "/news",
];
const FALLBACK_LINK_THRESHOLD: usize = 3;
const FALLBACK_PAGE_WINDOW: usize = 3;

/// Breadth-first, same-host crawler that records tracking tags per page.
///
/// Pages are fetched one at a time. A failed fetch is recorded as an error
/// page and the crawl moves on to the next queued URL.
pub struct Crawler {
    source: Arc<dyn HtmlSource>,
    max_pages: usize,
    seed_common_paths: bool,
    progress_callback: Option<ProgressCallback>,
}

/// A queued page: `url` is the normalized dedup key and fetch target,
/// `base` the URL its relative links resolve against
struct QueuedPage {
    url: String,
    base: Url,
}

#[derive(Default)]
struct CrawlState {
    visited: HashSet<String>,
    queued: HashSet<String>,
    queue: VecDeque<QueuedPage>,
}

impl CrawlState {
    fn enqueue(&mut self, url: String, base: Url) -> bool {
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.queue.push_back(QueuedPage { url, base });
        true
    }

    fn enqueue_path(&mut self, origin: &Url, path: &str) {
        if let Some(url) = join_path(origin, path)
            && let Ok(base) = Url::parse(&url)
        {
            self.enqueue(url, base);
        }
    }

    fn next(&mut self) -> Option<QueuedPage> {
        let page = self.queue.pop_front()?;
        self.queued.remove(&page.url);
        Some(page)
    }

    fn has_room(&self) -> bool {
        self.queue.len() < QUEUE_SOFT_CAP
    }
}

impl Crawler {
    pub fn new(source: Arc<dyn HtmlSource>) -> Self {
        Self {
            source,
            max_pages: DEFAULT_MAX_PAGES,
            seed_common_paths: true,
            progress_callback: None,
        }
    }

    /// Page budget, clamped to `1..=MAX_PAGES_LIMIT`
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.clamp(1, MAX_PAGES_LIMIT);
        self
    }

    pub fn with_common_paths(mut self, seed: bool) -> Self {
        self.seed_common_paths = seed;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub async fn crawl(&self, start_url: &str) -> Result<CrawlSummary> {
        let start = normalize_url(start_url)
            .ok_or_else(|| ScanError::InvalidUrl(start_url.to_string()))?;
        let start_parsed =
            Url::parse(&start).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", start, e)))?;
        let host = start_parsed
            .host_str()
            .ok_or_else(|| ScanError::InvalidUrl(format!("{} has no host", start)))?
            .to_string();

        // Keep the caller's trailing slash for resolving the first page's links
        let start_base = Url::parse(start_url.trim()).unwrap_or_else(|_| start_parsed.clone());

        info!("Starting crawl of {} (budget: {} pages)", start, self.max_pages);

        let mut state = CrawlState::default();
        state.enqueue(start.clone(), start_base);
        if self.seed_common_paths && is_homepage(&start_parsed) {
            for path in COMMON_PATHS {
                state.enqueue_path(&start_parsed, path);
            }
        }

        let mut results: Vec<PageResult> = Vec::new();

        while results.len() < self.max_pages {
            let Some(queued) = state.next() else {
                break;
            };
            if !state.visited.insert(queued.url.clone()) {
                continue;
            }
            let url = queued.url.clone();

            if let Some(ref callback) = self.progress_callback {
                callback(results.len(), url.clone());
            }

            let (page, links) = self.visit(&queued).await;
            let page_index = results.len();
            results.push(page);

            let same_host: Vec<Link> = links
                .into_iter()
                .filter(|link| is_same_host(&link.url, &host) && !is_skipped_resource(&link.url))
                .collect();

            let mut added = 0;
            for link in same_host.iter() {
                if added >= MAX_LINKS_PER_PAGE || !state.has_room() {
                    break;
                }
                if state.enqueue(link.url.clone(), link.href.clone()) {
                    debug!("  -> queued {}", link.url);
                    added += 1;
                }
            }

            if same_host.len() < FALLBACK_LINK_THRESHOLD && page_index < FALLBACK_PAGE_WINDOW {
                debug!(
                    "Only {} links on {}, injecting fallback paths",
                    same_host.len(),
                    url
                );
                for path in FALLBACK_PATHS {
                    if !state.has_room() {
                        break;
                    }
                    state.enqueue_path(&start_parsed, path);
                }
            }
        }

        let remaining = state.queue.len();
        info!(
            "Crawl complete. Analyzed {} pages, {} still queued",
            results.len(),
            remaining
        );
        Ok(build_summary(start, results, remaining))
    }

    /// Fetch and scan one page. Failures become error results, never errors.
    async fn visit(&self, queued: &QueuedPage) -> (PageResult, Vec<Link>) {
        let url = queued.url.as_str();
        let html = match self.source.fetch_html(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Crawl error for {}: {}", url, e);
                return (PageResult::with_error(url.to_string(), e.to_string()), Vec::new());
            }
        };

        let scan = scan_page(&html, &queued.base);
        let page = page_from_scan(url, &scan);
        (page, scan.links)
    }
}

pub(crate) fn page_from_scan(url: &str, scan: &PageScan) -> PageResult {
    let signals = &scan.signals;
    let confidence = signals.ga4_confidence();

    let mut page = PageResult::new(url.to_string());
    page.gtm_found = signals.gtm_found();
    page.ga4_found = confidence.is_detected();
    page.ga4_confidence = confidence;
    page.gtm_containers = signals.gtm_containers.clone();
    page.ga4_properties = signals.ga4_properties.clone();
    page.has_data_layer = signals.has_data_layer;
    page.legacy_ua_ids = signals.legacy_ua_ids.clone();
    page.links_found = scan.links.len();
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Ga4Confidence, PageStatus};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory site: path -> HTML. Unknown paths fail like a 404.
    struct FakeSite {
        pages: HashMap<String, String>,
        failing: HashSet<String>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                failing: HashSet::new(),
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, url: &str) -> Self {
            self.failing.insert(url.to_string());
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HtmlSource for FakeSite {
        async fn fetch_html(&self, url: &str) -> Result<String> {
            self.fetched.lock().unwrap().push(url.to_string());
            if self.failing.contains(url) {
                return Err(ScanError::Other("connection reset".to_string()));
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScanError::Upstream {
                    status: 404,
                    body: "not found".to_string(),
                })
        }
    }

    const GTM_PAGE: &str = r#"<script>(function(w,d,s,l,i){})(window,document,'script','dataLayer','GTM-TEST123');</script>"#;

    fn links_page(paths: &[&str]) -> String {
        let mut html = String::from(GTM_PAGE);
        for path in paths {
            html.push_str(&format!(r#"<a href="{}">link</a>"#, path));
        }
        html
    }

    #[tokio::test]
    async fn test_breadth_first_order() {
        let home = links_page(&["/a", "/b", "/c"]);
        let a = links_page(&["/a/deep"]);
        let site = Arc::new(FakeSite::new(&[
            ("https://example.com", home.as_str()),
            ("https://example.com/a", a.as_str()),
            ("https://example.com/b", GTM_PAGE),
            ("https://example.com/c", GTM_PAGE),
            ("https://example.com/a/deep", GTM_PAGE),
        ]));

        let crawler = Crawler::new(site.clone())
            .with_common_paths(false)
            .with_max_pages(5);
        let summary = crawler.crawl("https://example.com/").await.unwrap();

        assert_eq!(
            site.fetched(),
            vec![
                "https://example.com",
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c",
                "https://example.com/a/deep",
            ]
        );
        assert_eq!(summary.pages_analyzed, 5);
        assert_eq!(summary.pages_with_gtm, 5);
        assert_eq!(summary.gtm_containers, vec!["GTM-TEST123".to_string()]);
    }

    #[tokio::test]
    async fn test_never_fetches_same_url_twice() {
        // Every page links to every other page, with query/fragment noise
        let paths = ["/", "/x", "/x/", "/x?utm=1", "/y#top", "/y", "/z"];
        let html = links_page(&paths);
        let site = Arc::new(FakeSite::new(&[
            ("https://example.com", html.as_str()),
            ("https://example.com/x", html.as_str()),
            ("https://example.com/y", html.as_str()),
            ("https://example.com/z", html.as_str()),
        ]));

        let crawler = Crawler::new(site.clone()).with_max_pages(50);
        let summary = crawler.crawl("https://example.com").await.unwrap();

        let fetched = site.fetched();
        let unique: HashSet<&String> = fetched.iter().collect();
        assert_eq!(unique.len(), fetched.len(), "duplicate fetches: {:?}", fetched);
        assert_eq!(summary.pages_analyzed, fetched.len());
    }

    #[tokio::test]
    async fn test_budget_of_one_leaves_queue() {
        let paths: Vec<String> = (1..=10).map(|i| format!("/page{}", i)).collect();
        let refs: Vec<&str> = paths.iter().map(|p| p.as_str()).collect();
        let home = links_page(&refs);
        let site = Arc::new(FakeSite::new(&[("https://example.com", home.as_str())]));

        let crawler = Crawler::new(site.clone()).with_max_pages(1);
        let summary = crawler.crawl("https://example.com").await.unwrap();

        assert_eq!(summary.pages_analyzed, 1);
        assert_eq!(site.fetched().len(), 1);
        assert!(summary.estimated_pages_remaining > 0);
    }

    #[tokio::test]
    async fn test_failed_page_is_isolated() {
        let home = links_page(&["/ok", "/broken", "/after"]);
        let site = Arc::new(
            FakeSite::new(&[
                ("https://example.com", home.as_str()),
                ("https://example.com/ok", GTM_PAGE),
                ("https://example.com/after", GTM_PAGE),
            ])
            .failing("https://example.com/broken"),
        );

        let crawler = Crawler::new(site.clone())
            .with_common_paths(false)
            .with_max_pages(4);
        let summary = crawler.crawl("https://example.com").await.unwrap();

        assert_eq!(summary.pages_with_errors, 1);
        assert_eq!(summary.error_pages.len(), 1);
        assert_eq!(summary.error_pages[0].url, "https://example.com/broken");
        assert!(site.fetched().contains(&"https://example.com/after".to_string()));
        assert_eq!(
            summary.pages_analyzed,
            summary.successful_analysis + summary.pages_with_errors
        );
        let broken = summary
            .page_results
            .iter()
            .find(|p| p.url == "https://example.com/broken")
            .unwrap();
        assert_eq!(broken.status, PageStatus::Error);
    }

    #[tokio::test]
    async fn test_stays_on_host_and_skips_assets() {
        let home = links_page(&[
            "https://other.com/page",
            "https://sub.example.com/page",
            "/brochure.pdf",
            "/style.css",
            "/real",
        ]);
        let site = Arc::new(FakeSite::new(&[
            ("https://example.com", home.as_str()),
            ("https://example.com/real", GTM_PAGE),
        ]));

        let crawler = Crawler::new(site.clone())
            .with_common_paths(false)
            .with_max_pages(50);
        crawler.crawl("https://example.com").await.unwrap();

        for url in site.fetched() {
            assert!(url.starts_with("https://example.com"), "left host: {}", url);
            assert!(!url.ends_with(".pdf") && !url.ends_with(".css"));
        }
    }

    #[tokio::test]
    async fn test_links_per_page_capped() {
        let paths: Vec<String> = (1..=40).map(|i| format!("/p{}", i)).collect();
        let refs: Vec<&str> = paths.iter().map(|p| p.as_str()).collect();
        let home = links_page(&refs);
        let site = Arc::new(FakeSite::new(&[("https://example.com", home.as_str())]));

        let crawler = Crawler::new(site)
            .with_common_paths(false)
            .with_max_pages(1);
        let summary = crawler.crawl("https://example.com").await.unwrap();

        assert_eq!(summary.estimated_pages_remaining, MAX_LINKS_PER_PAGE);
    }

    #[tokio::test]
    async fn test_fallback_paths_when_page_has_no_links() {
        let site = Arc::new(FakeSite::new(&[("https://example.com/landing", GTM_PAGE)]));

        let crawler = Crawler::new(site.clone()).with_max_pages(2);
        let summary = crawler.crawl("https://example.com/landing").await.unwrap();

        // Not a homepage, so nothing seeded up front; the fallback fills the queue
        assert_eq!(site.fetched()[1], "https://example.com/about");
        assert!(summary.estimated_pages_remaining > 0);
    }

    #[tokio::test]
    async fn test_no_fallback_after_early_pages() {
        let start = links_page(&["/a", "/b", "/c"]);
        let a = links_page(&["/d", "/e", "/f"]);
        let b = links_page(&["/g", "/h", "/i"]);
        let site = Arc::new(FakeSite::new(&[
            ("https://example.com/start", start.as_str()),
            ("https://example.com/a", a.as_str()),
            ("https://example.com/b", b.as_str()),
            // Fourth page: no links at all
            ("https://example.com/c", GTM_PAGE),
        ]));

        let crawler = Crawler::new(site.clone()).with_max_pages(50);
        let summary = crawler.crawl("https://example.com/start").await.unwrap();

        let fetched = site.fetched();
        assert_eq!(fetched[3], "https://example.com/c");
        for path in FALLBACK_PATHS {
            let fallback = format!("https://example.com{}", path);
            assert!(!fetched.contains(&fallback), "fallback injected: {}", fallback);
        }
        assert_eq!(summary.pages_analyzed, 10);
        assert_eq!(summary.estimated_pages_remaining, 0);
    }

    #[tokio::test]
    async fn test_queue_soft_cap_stops_discovery_not_dequeuing() {
        // Page gN links to g(25N+1)..=g(25N+25), so numbering follows BFS order
        let pages: Vec<(String, String)> = (0..20)
            .map(|n| {
                let children: Vec<String> =
                    (1..=25).map(|i| format!("/g{}", 25 * n + i)).collect();
                let refs: Vec<&str> = children.iter().map(|c| c.as_str()).collect();
                (format!("https://example.com/g{}", n), links_page(&refs))
            })
            .collect();
        let refs: Vec<(&str, &str)> = pages
            .iter()
            .map(|(url, html)| (url.as_str(), html.as_str()))
            .collect();
        let site = Arc::new(FakeSite::new(&refs));

        let crawler = Crawler::new(site.clone())
            .with_common_paths(false)
            .with_max_pages(20);
        let summary = crawler.crawl("https://example.com/g0").await.unwrap();

        assert_eq!(summary.pages_analyzed, 20);
        assert_eq!(summary.pages_with_errors, 0);
        assert_eq!(site.fetched()[19], "https://example.com/g19");
        assert_eq!(summary.estimated_pages_remaining, QUEUE_SOFT_CAP);
    }

    #[tokio::test]
    async fn test_relative_links_resolve_against_directory_start() {
        let site = Arc::new(FakeSite::new(&[
            ("https://example.com/blog", r#"<a href="post-1">Post</a>"#),
            ("https://example.com/blog/post-1", GTM_PAGE),
        ]));

        let crawler = Crawler::new(site.clone())
            .with_common_paths(false)
            .with_max_pages(2);
        crawler.crawl("https://example.com/blog/").await.unwrap();

        assert_eq!(
            site.fetched(),
            vec!["https://example.com/blog", "https://example.com/blog/post-1"]
        );
    }

    #[tokio::test]
    async fn test_relative_links_resolve_against_discovered_directory() {
        let home = links_page(&["/docs/", "/x", "/y"]);
        let docs = links_page(&["intro"]);
        let site = Arc::new(FakeSite::new(&[
            ("https://example.com", home.as_str()),
            ("https://example.com/docs", docs.as_str()),
            ("https://example.com/docs/intro", GTM_PAGE),
        ]));

        let crawler = Crawler::new(site.clone())
            .with_common_paths(false)
            .with_max_pages(5);
        crawler.crawl("https://example.com").await.unwrap();

        let fetched = site.fetched();
        assert_eq!(fetched[4], "https://example.com/docs/intro");
        assert!(!fetched.contains(&"https://example.com/intro".to_string()));
    }

    #[tokio::test]
    async fn test_homepage_seeds_common_paths() {
        let site = Arc::new(FakeSite::new(&[("https://example.com", links_page(&["/a", "/b", "/c"]).as_str())]));

        let crawler = Crawler::new(site.clone()).with_max_pages(3);
        crawler.crawl("https://example.com").await.unwrap();

        assert_eq!(
            site.fetched(),
            vec!["https://example.com", "https://example.com/about", "https://example.com/contact"]
        );
    }

    #[tokio::test]
    async fn test_invalid_start_url() {
        let site = Arc::new(FakeSite::new(&[]));
        let result = Crawler::new(site).crawl("not a url").await;
        assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
    }

    #[test]
    fn test_budget_is_clamped() {
        let site = Arc::new(FakeSite::new(&[]));
        assert_eq!(Crawler::new(site.clone()).with_max_pages(0).max_pages(), 1);
        assert_eq!(
            Crawler::new(site).with_max_pages(10_000).max_pages(),
            MAX_PAGES_LIMIT
        );
    }

    #[tokio::test]
    async fn test_progress_callback_sees_each_page() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let site = Arc::new(FakeSite::new(&[("https://example.com", links_page(&["/a", "/b", "/c"]).as_str())]));

        let crawler = Crawler::new(site)
            .with_common_paths(false)
            .with_max_pages(3)
            .with_progress_callback(Arc::new(move |index, url| {
                seen_clone.lock().unwrap().push((index, url));
            }));
        crawler.crawl("https://example.com").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], (0, "https://example.com".to_string()));
    }

    #[test]
    fn test_page_from_scan_marks_inferred_ga4() {
        let url = Url::parse("https://example.com").unwrap();
        let scan = scan_page(GTM_PAGE, &url);
        let page = page_from_scan("https://example.com", &scan);
        assert!(page.gtm_found);
        assert!(page.ga4_found);
        assert_eq!(page.ga4_confidence, Ga4Confidence::Inferred);
        assert!(page.ga4_properties.is_empty());
    }
}
