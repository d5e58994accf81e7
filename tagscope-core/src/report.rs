// Report generation for crawls, single-page analyses and GA4 scores

use crate::score::{Importance, ScoreReport, Suggestion};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tagscope_scanner::analyzer::{CheckStatus, SiteAnalysis};
use tagscope_scanner::result::CrawlSummary;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const THIN_RULE: &str =
    "────────────────────────────────────────────────────────────────────────────────\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Anything a report can be produced for
#[derive(Debug, Clone)]
pub enum ReportData {
    Crawl(CrawlSummary),
    Page(SiteAnalysis),
    Score(ScoreReport),
}

impl ReportData {
    fn kind(&self) -> &'static str {
        match self {
            ReportData::Crawl(_) => "site_crawl",
            ReportData::Page(_) => "page_analysis",
            ReportData::Score(_) => "ga4_score",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ReportData::Crawl(_) => "TAGSCOPE SITE CRAWL REPORT",
            ReportData::Page(_) => "TAGSCOPE PAGE ANALYSIS REPORT",
            ReportData::Score(_) => "TAGSCOPE GA4 CONFIGURATION SCORE",
        }
    }

    fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            ReportData::Crawl(summary) => serde_json::to_value(summary),
            ReportData::Page(analysis) => serde_json::to_value(analysis),
            ReportData::Score(score) => serde_json::to_value(score),
        }
    }
}

pub fn render_report(data: &ReportData, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str(&format!("{:^80}\n", data.title()));
    report.push_str(RULE);
    report.push('\n');

    match data {
        ReportData::Crawl(summary) => write_crawl_sections(&mut report, summary),
        ReportData::Page(analysis) => write_page_sections(&mut report, analysis),
        ReportData::Score(score) => write_score_sections(&mut report, score),
    }

    // Footer
    report.push_str(RULE);
    report.push_str(&format!("{:^80}\n", "End of Report"));
    report.push_str(RULE);
    report.push_str("\nGenerated by Tagscope - GTM & GA4 tracking auditor\n\n");

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Tagscope",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json",
                "kind": data.kind()
            },
            "data": data.payload()?
        }
    });

    serde_json::to_string_pretty(&json_report)
}

/// Write a report, expanding `~` and environment variables in the path.
/// Returns the path actually written.
pub fn save_report(content: &str, path: &str) -> std::io::Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let path = PathBuf::from(expanded.as_ref());
    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    Ok(path)
}

fn section(report: &mut String, heading: &str) {
    report.push_str(RULE);
    report.push_str(heading);
    report.push('\n');
    report.push_str(RULE);
    report.push('\n');
}

fn bullet_list(report: &mut String, items: &[String]) {
    for item in items {
        let wrapped = wrap_text(item, 80, "    ");
        // First line carries the bullet
        report.push_str("  • ");
        report.push_str(wrapped.trim_start());
    }
    report.push('\n');
}

fn id_list(ids: &[String]) -> String {
    if ids.is_empty() {
        "none".to_string()
    } else {
        ids.join(", ")
    }
}

fn write_crawl_sections(report: &mut String, s: &CrawlSummary) {
    report.push_str(&format!("Start URL:        {}\n", s.start_url));
    report.push_str(&format!("Pages Analyzed:   {}\n", s.pages_analyzed));
    report.push_str(&format!("Successful:       {}\n", s.successful_analysis));
    report.push_str(&format!("Errors:           {}\n", s.pages_with_errors));
    report.push_str(&format!("Not Analyzed:     {}\n", s.estimated_pages_remaining));
    report.push('\n');

    section(report, "TRACKING COVERAGE");
    report.push_str(&format!("Coverage:         {}%\n", s.coverage_percent));
    report.push_str(&format!("Pages with GTM:   {}\n", s.pages_with_gtm));
    report.push_str(&format!(
        "Pages with GA4:   {} ({} confirmed)\n",
        s.pages_with_ga4, s.pages_with_confirmed_ga4
    ));
    report.push_str(&format!("GTM Containers:   {}\n", id_list(&s.gtm_containers)));
    report.push_str(&format!("GA4 Properties:   {}\n", id_list(&s.ga4_properties)));
    report.push('\n');

    if !s.insights.is_empty() {
        section(report, "INSIGHTS");
        bullet_list(report, &s.insights);
    }

    if !s.recommendations.is_empty() {
        section(report, "RECOMMENDATIONS");
        bullet_list(report, &s.recommendations);
    }

    if !s.pages_missing_tracking.is_empty() {
        section(report, "PAGES WITHOUT TRACKING");
        for url in &s.pages_missing_tracking {
            report.push_str(&format!("  {}\n", url));
        }
        report.push('\n');
    }

    if !s.error_pages.is_empty() {
        section(report, "PAGES THAT FAILED");
        for page in &s.error_pages {
            report.push_str(&format!("  {}\n", page.url));
            report.push_str(&wrap_text(&page.error, 80, "      "));
        }
        report.push('\n');
    }
}

fn write_page_sections(report: &mut String, a: &SiteAnalysis) {
    report.push_str(&format!("URL:              {}\n", a.url));
    report.push_str(&format!(
        "GTM:              {}\n",
        if a.gtm_found { "found" } else { "not found" }
    ));
    report.push_str(&format!(
        "GA4:              {} ({})\n",
        if a.ga4_found { "found" } else { "not found" },
        a.ga4_confidence.as_str()
    ));
    report.push_str(&format!("GTM Containers:   {}\n", id_list(&a.gtm_containers)));
    report.push_str(&format!("GA4 Properties:   {}\n", id_list(&a.ga4_properties)));
    if !a.legacy_ua_ids.is_empty() {
        report.push_str(&format!("Legacy UA:        {}\n", a.legacy_ua_ids.join(", ")));
    }
    report.push_str(&format!(
        "dataLayer:        {}\n",
        if a.has_data_layer { "present" } else { "absent" }
    ));
    report.push('\n');

    section(report, "CONFIGURATION CHECKS");
    for check in &a.configuration_audit {
        let tag = match check.status {
            CheckStatus::Found => "[FOUND]  ",
            CheckStatus::Missing => "[MISSING]",
            CheckStatus::Warning => "[WARNING]",
        };
        report.push_str(&format!("  {} {}: {}\n", tag, check.category, check.check));
    }
    report.push('\n');

    if !a.recommendations.is_empty() {
        section(report, "RECOMMENDATIONS");
        bullet_list(report, &a.recommendations);
    }
}

fn write_score_sections(report: &mut String, s: &ScoreReport) {
    report.push_str(&format!("Score:            {}/100\n", s.score));
    report.push_str(&format!("Grade:            {}\n", s.grade.as_str()));
    report.push_str(&format!("Points Lost:      {}\n", -s.total_deduction));
    report.push('\n');

    let groups: [(Importance, &[Suggestion]); 4] = [
        (Importance::Critical, &s.by_importance.critical),
        (Importance::Important, &s.by_importance.important),
        (Importance::Moderate, &s.by_importance.moderate),
        (Importance::Optional, &s.by_importance.optional),
    ];

    if !s.suggestions.is_empty() {
        section(report, "SUGGESTIONS");
        let mut idx = 0;
        for (importance, suggestions) in groups {
            for suggestion in suggestions {
                idx += 1;
                report.push_str(&format!("[{}] {}\n", idx, suggestion.label));
                report.push_str(&format!(
                    "Importance:   {}\n",
                    importance.as_str().to_uppercase()
                ));
                report.push_str(&format!("Points:       {}\n", suggestion.points));
                report.push('\n');
                report.push_str(&wrap_text(&suggestion.suggestion, 80, "  "));
                report.push('\n');
                report.push_str(THIN_RULE);
                report.push('\n');
            }
        }
    }

    if !s.passed.is_empty() {
        section(report, "PASSED CHECKS");
        for label in &s.passed {
            report.push_str(&format!("  ✓ {}\n", label));
        }
        report.push('\n');
    }
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.len() + word.len() + 1 > width - indent.len() && !current_line.is_empty() {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_respects_width() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let wrapped = wrap_text(text, 20, "  ");
        for line in wrapped.lines() {
            assert!(line.len() <= 20, "{:?}", line);
            assert!(line.starts_with("  "));
        }
        assert_eq!(
            wrapped.split_whitespace().collect::<Vec<_>>().join(" "),
            text
        );
    }

    #[test]
    fn test_wrap_text_empty() {
        assert_eq!(wrap_text("", 80, "  "), "");
    }

    #[test]
    fn test_id_list() {
        assert_eq!(id_list(&[]), "none");
        assert_eq!(
            id_list(&["GTM-A".to_string(), "GTM-B".to_string()]),
            "GTM-A, GTM-B"
        );
    }
}
