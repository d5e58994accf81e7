pub mod analyzer;
pub mod crawler;
pub mod detect;
pub mod error;
pub mod normalize;
pub mod result;
pub mod source;
mod summary;

pub use analyzer::{CheckStatus, ConfigCheck, SiteAnalysis, analyze_html, analyze_page};
pub use crawler::{Crawler, DEFAULT_MAX_PAGES, MAX_PAGES_LIMIT, ProgressCallback};
pub use error::ScanError;
pub use result::{CrawlSummary, ErrorPage, Ga4Confidence, PageResult, PageStatus};
pub use source::{DirectFetcher, FetchConfig, HtmlSource, ProxyConfig, RenderProxy};
