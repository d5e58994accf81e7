use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Success,
    Error,
}

/// How sure we are that a page reports to GA4.
///
/// `Inferred` means a GTM container and a dataLayer (or a bare Google
/// Analytics script reference) were seen, but no measurement ID. The GA4
/// tag may live inside the container, or it may not exist at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Ga4Confidence {
    Confirmed,
    Inferred,
    #[default]
    None,
}

impl Ga4Confidence {
    pub fn is_detected(&self) -> bool {
        !matches!(self, Ga4Confidence::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ga4Confidence::Confirmed => "confirmed",
            Ga4Confidence::Inferred => "inferred",
            Ga4Confidence::None => "none",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub url: String,
    pub status: PageStatus,
    pub gtm_found: bool,
    pub ga4_found: bool,
    pub ga4_confidence: Ga4Confidence,
    pub gtm_containers: Vec<String>,
    pub ga4_properties: Vec<String>,
    pub has_data_layer: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legacy_ua_ids: Vec<String>,
    pub links_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    pub fn new(url: String) -> Self {
        Self {
            url,
            status: PageStatus::Success,
            gtm_found: false,
            ga4_found: false,
            ga4_confidence: Ga4Confidence::None,
            gtm_containers: Vec::new(),
            ga4_properties: Vec::new(),
            has_data_layer: false,
            legacy_ua_ids: Vec::new(),
            links_found: 0,
            error: None,
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            status: PageStatus::Error,
            error: Some(error),
            ..Self::new(url)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PageStatus::Success
    }

    /// A successfully analyzed page with neither GTM nor GA4 on it
    pub fn is_untracked(&self) -> bool {
        self.is_success() && !self.gtm_found && !self.ga4_found
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPage {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSummary {
    pub start_url: String,
    pub pages_analyzed: usize,
    pub successful_analysis: usize,
    pub pages_with_errors: usize,
    pub pages_with_gtm: usize,
    pub pages_with_ga4: usize,
    pub pages_with_confirmed_ga4: usize,
    pub coverage_percent: u32,
    pub gtm_containers: Vec<String>,
    pub ga4_properties: Vec<String>,
    pub pages_missing_tracking: Vec<String>,
    pub error_pages: Vec<ErrorPage>,
    pub page_results: Vec<PageResult>,
    pub estimated_pages_remaining: usize,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}
