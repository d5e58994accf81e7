use crate::detect::{TagSignals, detect_tags};
use crate::error::{Result, ScanError};
use crate::normalize::normalize_url;
use crate::result::Ga4Confidence;
use crate::source::HtmlSource;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Found,
    Missing,
    Warning,
}

/// One line of the single-page configuration audit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCheck {
    pub category: String,
    pub check: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAnalysis {
    pub url: String,
    pub gtm_found: bool,
    pub ga4_found: bool,
    pub ga4_confidence: Ga4Confidence,
    pub gtm_containers: Vec<String>,
    pub ga4_properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legacy_ua_ids: Vec<String>,
    pub has_data_layer: bool,
    pub configuration_audit: Vec<ConfigCheck>,
    pub recommendations: Vec<String>,
}

/// Presence check on the raw HTML
struct MarkerCheck {
    category: &'static str,
    check: &'static str,
    markers: &'static [&'static str],
    recommendation: &'static str,
}

const MARKER_CHECKS: &[MarkerCheck] = &[
    MarkerCheck {
        category: "Privacy",
        check: "Consent mode",
        markers: &["consent"],
        recommendation: "Implement Google Consent Mode v2 so tags respect visitor consent choices.",
    },
    MarkerCheck {
        category: "Cross-domain",
        check: "Linker configuration",
        markers: &["linker"],
        recommendation: "If visitors move between your own domains, configure cross-domain measurement.",
    },
    MarkerCheck {
        category: "Advertising",
        check: "Google Ads tag",
        markers: &["AW-"],
        recommendation: "Install the Google Ads tag and link Google Ads to GA4 to measure paid conversions.",
    },
    MarkerCheck {
        category: "Ecommerce",
        check: "Ecommerce events",
        markers: &["purchase", "ecommerce"],
        recommendation: "Send GA4 ecommerce events (view_item, add_to_cart, purchase) if you sell online.",
    },
    MarkerCheck {
        category: "Identity",
        check: "User ID",
        markers: &["user_id"],
        recommendation: "Send a user_id for signed-in visitors to unify cross-device journeys.",
    },
    MarkerCheck {
        category: "Events",
        check: "Custom events",
        markers: &["gtag('event'", "gtag(\"event\"", "event:"],
        recommendation: "Track the interactions that matter to your business as custom events.",
    },
    MarkerCheck {
        category: "Infrastructure",
        check: "Server-side tagging",
        markers: &["server_container_url", "transport_url"],
        recommendation: "Consider server-side tagging to improve data quality and page performance.",
    },
];

/// Fetch one page and analyze it. Fetch failures are returned, not recorded.
pub async fn analyze_page(source: &dyn HtmlSource, url: &str) -> Result<SiteAnalysis> {
    let normalized = normalize_url(url).ok_or_else(|| ScanError::InvalidUrl(url.to_string()))?;
    info!("Analyzing single page {}", normalized);
    let html = source.fetch_html(&normalized).await?;
    Ok(analyze_html(&normalized, &html))
}

pub fn analyze_html(url: &str, html: &str) -> SiteAnalysis {
    let signals = detect_tags(html);
    let confidence = signals.ga4_confidence();

    let mut configuration_audit: Vec<ConfigCheck> = MARKER_CHECKS
        .iter()
        .map(|c| {
            let found = c.markers.iter().any(|m| html.contains(m));
            ConfigCheck {
                category: c.category.to_string(),
                check: c.check.to_string(),
                status: if found {
                    CheckStatus::Found
                } else {
                    CheckStatus::Missing
                },
                recommendation: (!found).then(|| c.recommendation.to_string()),
            }
        })
        .collect();
    configuration_audit.push(deployment_check(&signals, confidence));

    let mut recommendations = tag_recommendations(&signals, confidence);
    recommendations.extend(
        configuration_audit
            .iter()
            .filter_map(|c| c.recommendation.clone()),
    );

    SiteAnalysis {
        url: url.to_string(),
        gtm_found: signals.gtm_found(),
        ga4_found: confidence.is_detected(),
        ga4_confidence: confidence,
        gtm_containers: signals.gtm_containers,
        ga4_properties: signals.ga4_properties,
        legacy_ua_ids: signals.legacy_ua_ids,
        has_data_layer: signals.has_data_layer,
        configuration_audit,
        recommendations,
    }
}

fn deployment_check(signals: &TagSignals, confidence: Ga4Confidence) -> ConfigCheck {
    let (status, recommendation) = if signals.gtm_found() && confidence == Ga4Confidence::Confirmed
    {
        (
            CheckStatus::Warning,
            Some(
                "GA4 is hard-coded alongside GTM. Make sure the same measurement ID is not also fired from the container."
                    .to_string(),
            ),
        )
    } else if !signals.gtm_found() && !confidence.is_detected() {
        (
            CheckStatus::Missing,
            Some("No Google tag found. Deploy GA4 through GTM or gtag.js.".to_string()),
        )
    } else {
        (CheckStatus::Found, None)
    };

    ConfigCheck {
        category: "Deployment".to_string(),
        check: "Single tag deployment".to_string(),
        status,
        recommendation,
    }
}

fn tag_recommendations(signals: &TagSignals, confidence: Ga4Confidence) -> Vec<String> {
    let mut out = Vec::new();
    if confidence == Ga4Confidence::Inferred {
        out.push(
            "GA4 could not be confirmed from the page source. Verify the Google tag inside your GTM container."
                .to_string(),
        );
    }
    if signals.gtm_containers.len() > 1 {
        out.push(format!(
            "{} GTM containers load on this page. Remove any that are no longer used.",
            signals.gtm_containers.len()
        ));
    }
    if !signals.legacy_ua_ids.is_empty() {
        out.push(format!(
            "Remove legacy Universal Analytics tags ({}).",
            signals.legacy_ua_ids.join(", ")
        ));
    }
    out
}
