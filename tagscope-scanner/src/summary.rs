// Aggregate per-page results into the crawl summary, insights and recommendations

use crate::result::{CrawlSummary, ErrorPage, Ga4Confidence, PageResult};
use std::collections::BTreeSet;

const MISSING_PAGES_LISTED: usize = 5;

pub(crate) fn build_summary(
    start_url: String,
    page_results: Vec<PageResult>,
    estimated_pages_remaining: usize,
) -> CrawlSummary {
    let pages_analyzed = page_results.len();
    let successful: Vec<&PageResult> = page_results.iter().filter(|p| p.is_success()).collect();
    let successful_analysis = successful.len();
    let pages_with_errors = pages_analyzed - successful_analysis;

    let pages_with_gtm = successful.iter().filter(|p| p.gtm_found).count();
    let pages_with_ga4 = successful.iter().filter(|p| p.ga4_found).count();
    let pages_with_confirmed_ga4 = successful
        .iter()
        .filter(|p| p.ga4_confidence == Ga4Confidence::Confirmed)
        .count();

    let coverage_percent = coverage(pages_with_gtm.max(pages_with_ga4), successful_analysis);

    let gtm_containers: BTreeSet<String> = successful
        .iter()
        .flat_map(|p| p.gtm_containers.iter().cloned())
        .collect();
    let ga4_properties: BTreeSet<String> = successful
        .iter()
        .flat_map(|p| p.ga4_properties.iter().cloned())
        .collect();
    let legacy_ua: BTreeSet<String> = successful
        .iter()
        .flat_map(|p| p.legacy_ua_ids.iter().cloned())
        .collect();

    let pages_missing_tracking: Vec<String> = successful
        .iter()
        .filter(|p| p.is_untracked())
        .map(|p| p.url.clone())
        .collect();

    let error_pages: Vec<ErrorPage> = page_results
        .iter()
        .filter(|p| !p.is_success())
        .map(|p| ErrorPage {
            url: p.url.clone(),
            error: p.error.clone().unwrap_or_else(|| "unknown error".to_string()),
        })
        .collect();

    let mut summary = CrawlSummary {
        start_url,
        pages_analyzed,
        successful_analysis,
        pages_with_errors,
        pages_with_gtm,
        pages_with_ga4,
        pages_with_confirmed_ga4,
        coverage_percent,
        gtm_containers: gtm_containers.into_iter().collect(),
        ga4_properties: ga4_properties.into_iter().collect(),
        pages_missing_tracking,
        error_pages,
        page_results,
        estimated_pages_remaining,
        insights: Vec::new(),
        recommendations: Vec::new(),
    };

    summary.insights = insights(&summary);
    summary.recommendations = recommendations(&summary, &legacy_ua);
    summary
}

fn coverage(tracked: usize, analyzed: usize) -> u32 {
    if analyzed == 0 {
        return 0;
    }
    ((tracked as f64 / analyzed as f64) * 100.0).round() as u32
}

fn inferred_pages(summary: &CrawlSummary) -> usize {
    summary.pages_with_ga4 - summary.pages_with_confirmed_ga4
}

fn insights(s: &CrawlSummary) -> Vec<String> {
    let mut out = Vec::new();

    if s.successful_analysis == 0 {
        out.push("No pages could be analyzed. Check that the site is reachable.".to_string());
        return out;
    }

    out.push(format!(
        "Google Tag Manager found on {} of {} analyzed pages.",
        s.pages_with_gtm, s.successful_analysis
    ));
    out.push(format!(
        "GA4 detected on {} of {} analyzed pages ({} with a visible measurement ID).",
        s.pages_with_ga4, s.successful_analysis, s.pages_with_confirmed_ga4
    ));

    let inferred = inferred_pages(s);
    if inferred > 0 {
        out.push(format!(
            "{} page(s) load tags without a visible GA4 ID. GA4 is assumed to be configured inside GTM.",
            inferred
        ));
    }
    if s.gtm_containers.len() > 1 {
        out.push(format!(
            "Multiple GTM containers in use: {}.",
            s.gtm_containers.join(", ")
        ));
    }
    if s.ga4_properties.len() > 1 {
        out.push(format!(
            "Multiple GA4 measurement IDs in use: {}.",
            s.ga4_properties.join(", ")
        ));
    }
    if s.coverage_percent == 100 {
        out.push("Every analyzed page carries a tracking tag.".to_string());
    } else {
        out.push(format!(
            "Tracking coverage is {}% ({} page(s) without any tag).",
            s.coverage_percent,
            s.pages_missing_tracking.len()
        ));
    }
    if s.pages_with_errors > 0 {
        out.push(format!("{} page(s) could not be analyzed.", s.pages_with_errors));
    }
    if s.estimated_pages_remaining > 0 {
        out.push(format!(
            "{} discovered page(s) were not analyzed within the page budget.",
            s.estimated_pages_remaining
        ));
    }

    out
}

fn recommendations(s: &CrawlSummary, legacy_ua: &BTreeSet<String>) -> Vec<String> {
    let mut out = Vec::new();

    if s.successful_analysis > 0 && s.pages_with_gtm == 0 && s.pages_with_ga4 == 0 {
        out.push(
            "Install Google Tag Manager or the GA4 Google tag (gtag.js) on every page.".to_string(),
        );
    } else if !s.pages_missing_tracking.is_empty() {
        let listed: Vec<&str> = s
            .pages_missing_tracking
            .iter()
            .take(MISSING_PAGES_LISTED)
            .map(|u| u.as_str())
            .collect();
        out.push(format!(
            "Add tracking to the {} page(s) missing it, starting with: {}.",
            s.pages_missing_tracking.len(),
            listed.join(", ")
        ));
    }

    if s.gtm_containers.len() > 1 {
        out.push(
            "Consolidate to a single GTM container unless separate teams own each one.".to_string(),
        );
    }
    if s.ga4_properties.len() > 1 {
        out.push(
            "Check that multiple GA4 measurement IDs are intentional; duplicate tags inflate sessions."
                .to_string(),
        );
    }
    if inferred_pages(s) > 0 && s.pages_with_confirmed_ga4 == 0 {
        out.push(
            "Verify in GTM that a Google tag for GA4 fires on all pages; it could not be confirmed from the page source."
                .to_string(),
        );
    }
    if !legacy_ua.is_empty() {
        out.push(format!(
            "Remove legacy Universal Analytics tags ({}); they no longer collect data.",
            legacy_ua.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    if s.pages_with_errors > 0 {
        out.push(
            "Re-check the pages that failed to load; they may be blocked for the rendering proxy."
                .to_string(),
        );
    }
    if s.estimated_pages_remaining > 0 {
        out.push(format!(
            "Increase maxPages to cover the {} remaining discovered page(s).",
            s.estimated_pages_remaining
        ));
    }

    out
}
