pub mod admin;
pub mod audit;
pub mod crawl;
pub mod report;
pub mod score;

pub use admin::{AccountSummary, AdminClient, AdminError, PropertySummary, UserInfo};
pub use audit::Ga4Audit;
pub use crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl, execute_crawl_with_source};
pub use report::{ReportData, ReportFormat, render_report, save_report};
pub use score::{Grade, Importance, ScoreReport, Suggestion, score_audit};
