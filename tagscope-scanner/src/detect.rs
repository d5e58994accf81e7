//! Tracking tag detection.
//!
//! The document is parsed once; script sources, inline script bodies and
//! `<noscript>` fallbacks form the corpus the ID patterns run over, so IDs
//! that only appear in visible page copy are not reported.

use crate::normalize::{normalize_url, resolve_href};
use crate::result::Ga4Confidence;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use url::Url;

static GTM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bGTM-[A-Z0-9]{4,}\b").expect("valid GTM pattern"));
static GTAG_CONFIG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"gtag\(\s*['"]config['"]\s*,\s*['"](G-[A-Z0-9]{4,})['"]"#)
        .expect("valid gtag config pattern")
});
static GTAG_SRC_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"gtag/js\?(?:[^\s'\x22]*&)?id=(G-[A-Z0-9]{4,})").expect("valid gtag src pattern")
});
static UA_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bUA-\d{4,}-\d{1,4}\b").expect("valid UA pattern"));
static DATA_LAYER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdataLayer\b").expect("valid dataLayer pattern"));

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid selector"));
static NOSCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("noscript").expect("valid selector"));
static IFRAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe[src]").expect("valid selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href], area[href]").expect("valid selector"));

/// Everything the tag patterns found on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSignals {
    pub gtm_containers: Vec<String>,
    pub ga4_properties: Vec<String>,
    pub legacy_ua_ids: Vec<String>,
    pub has_data_layer: bool,
    pub loads_gtm_script: bool,
    pub loads_analytics_script: bool,
}

impl TagSignals {
    pub fn gtm_found(&self) -> bool {
        !self.gtm_containers.is_empty()
    }

    pub fn ga4_confidence(&self) -> Ga4Confidence {
        if !self.ga4_properties.is_empty() {
            Ga4Confidence::Confirmed
        } else if (self.gtm_found() && self.has_data_layer) || self.loads_analytics_script {
            Ga4Confidence::Inferred
        } else {
            Ga4Confidence::None
        }
    }
}

/// An outbound link: the normalized crawl key plus the absolute URL it was
/// resolved to, which relative links on the target page resolve against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub href: Url,
}

/// Tag signals plus the outbound links of a page
#[derive(Debug, Clone, Default)]
pub struct PageScan {
    pub signals: TagSignals,
    pub links: Vec<Link>,
}

/// Parse `html` once and pull out both tag signals and normalized links
pub fn scan_page(html: &str, page_url: &Url) -> PageScan {
    let document = Html::parse_document(html);
    PageScan {
        signals: signals_from_corpus(&script_corpus(&document)),
        links: extract_links(&document, page_url),
    }
}

/// Tag signals for a page without link extraction
pub fn detect_tags(html: &str) -> TagSignals {
    let document = Html::parse_document(html);
    signals_from_corpus(&script_corpus(&document))
}

fn script_corpus(document: &Html) -> String {
    let mut corpus = String::new();

    for script in document.select(&SCRIPT) {
        if let Some(src) = script.value().attr("src") {
            corpus.push_str(src);
            corpus.push('\n');
        }
        for text in script.text() {
            corpus.push_str(text);
        }
        corpus.push('\n');
    }

    // GTM's no-JS fallback iframe carries the container ID
    for noscript in document.select(&NOSCRIPT) {
        for text in noscript.text() {
            corpus.push_str(text);
        }
        corpus.push('\n');
    }
    for iframe in document.select(&IFRAME) {
        if let Some(src) = iframe.value().attr("src") {
            corpus.push_str(src);
            corpus.push('\n');
        }
    }

    corpus
}

fn signals_from_corpus(corpus: &str) -> TagSignals {
    let gtm: BTreeSet<String> = GTM_ID
        .find_iter(corpus)
        .map(|m| m.as_str().to_string())
        .collect();

    let ga4: BTreeSet<String> = GTAG_CONFIG
        .captures_iter(corpus)
        .chain(GTAG_SRC_ID.captures_iter(corpus))
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();

    let ua: BTreeSet<String> = UA_ID
        .find_iter(corpus)
        .map(|m| m.as_str().to_string())
        .collect();

    TagSignals {
        gtm_containers: gtm.into_iter().collect(),
        ga4_properties: ga4.into_iter().collect(),
        legacy_ua_ids: ua.into_iter().collect(),
        has_data_layer: DATA_LAYER.is_match(corpus),
        loads_gtm_script: corpus.contains("googletagmanager.com/gtm.js")
            || corpus.contains("googletagmanager.com/ns.html"),
        loads_analytics_script: corpus.contains("google-analytics.com")
            || corpus.contains("googletagmanager.com/gtag/js"),
    }
}

fn extract_links(document: &Html, page_url: &Url) -> Vec<Link> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&LINK) {
        if let Some(href) = element.value().attr("href")
            && let Some(absolute) = resolve_href(page_url, href)
            && let Some(url) = normalize_url(absolute.as_str())
            && seen.insert(url.clone())
        {
            links.push(Link { url, href: absolute });
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const GTM_SNIPPET: &str = r#"<html><head>
        <script>(function(w,d,s,l,i){w[l]=w[l]||[];w[l].push({'gtm.start':
        new Date().getTime(),event:'gtm.js'});var f=d.getElementsByTagName(s)[0],
        j=d.createElement(s),dl=l!='dataLayer'?'&l='+l:'';j.async=true;j.src=
        'https://www.googletagmanager.com/gtm.js?id='+i+dl;f.parentNode.insertBefore(j,f);
        })(window,document,'script','dataLayer','GTM-ABC1234');</script>
        </head><body>
        <noscript><iframe src="https://www.googletagmanager.com/ns.html?id=GTM-ABC1234"
        height="0" width="0"></iframe></noscript>
        </body></html>"#;

    const GTAG_SNIPPET: &str = r#"<html><head>
        <script async src="https://www.googletagmanager.com/gtag/js?id=G-XYZ98765"></script>
        <script>
          window.dataLayer = window.dataLayer || [];
          function gtag(){dataLayer.push(arguments);}
          gtag('js', new Date());
          gtag('config', 'G-XYZ98765');
          gtag("config", "G-SECOND123");
        </script></head><body></body></html>"#;

    #[test]
    fn test_detects_gtm_container_once() {
        let signals = detect_tags(GTM_SNIPPET);
        assert_eq!(signals.gtm_containers, vec!["GTM-ABC1234".to_string()]);
        assert!(signals.has_data_layer);
        assert!(signals.ga4_properties.is_empty());
    }

    #[test]
    fn test_gtm_with_data_layer_is_inferred_ga4() {
        let signals = detect_tags(GTM_SNIPPET);
        assert_eq!(signals.ga4_confidence(), Ga4Confidence::Inferred);
    }

    #[test]
    fn test_detects_direct_gtag_ids() {
        let signals = detect_tags(GTAG_SNIPPET);
        assert_eq!(
            signals.ga4_properties,
            vec!["G-SECOND123".to_string(), "G-XYZ98765".to_string()]
        );
        assert_eq!(signals.ga4_confidence(), Ga4Confidence::Confirmed);
        assert!(!signals.gtm_found());
        assert!(signals.loads_analytics_script);
    }

    #[test]
    fn test_ids_in_page_copy_are_ignored() {
        let html = "<html><body><p>Our container is GTM-NOTREAL1 and G-NOTREAL99</p></body></html>";
        let signals = detect_tags(html);
        assert!(signals.gtm_containers.is_empty());
        assert!(signals.ga4_properties.is_empty());
        assert_eq!(signals.ga4_confidence(), Ga4Confidence::None);
    }

    #[test]
    fn test_legacy_universal_analytics() {
        let html = r#"<script>ga('create', 'UA-123456-1', 'auto');</script>
            <script src="https://www.google-analytics.com/analytics.js"></script>"#;
        let signals = detect_tags(html);
        assert_eq!(signals.legacy_ua_ids, vec!["UA-123456-1".to_string()]);
        assert_eq!(signals.ga4_confidence(), Ga4Confidence::Inferred);
    }

    #[test]
    fn test_scan_page_extracts_links() {
        let base = Url::parse("https://example.com/").unwrap();
        let html = r#"<html><body>
            <a href="/about">About</a>
            <a href='/about/'>About again</a>
            <a href="https://example.com/contact?x=1">Contact</a>
            <a href="https://other.com/">Elsewhere</a>
            <a href="mailto:x@example.com">Mail</a>
            <map><area href="/map-target"></map>
        </body></html>"#;
        let scan = scan_page(html, &base);
        let urls: Vec<String> = scan.links.iter().map(|l| l.url.clone()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/about".to_string(),
                "https://example.com/contact".to_string(),
                "https://other.com".to_string(),
                "https://example.com/map-target".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_document() {
        let signals = detect_tags("");
        assert_eq!(signals, TagSignals::default());
    }
}
