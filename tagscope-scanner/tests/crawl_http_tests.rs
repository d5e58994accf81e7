// End-to-end crawls against a mock site served over HTTP

use std::sync::Arc;
use tagscope_scanner::{Crawler, FetchConfig, Ga4Confidence, PageStatus};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const GTM_HEAD: &str = r#"<script>(function(w,d,s,l,i){w[l]=w[l]||[];})(window,document,'script','dataLayer','GTM-MOCK123');</script>"#;

async fn mount_page(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(html),
        )
        .mount(server)
        .await;
}

fn page_with_links(base: &str, paths: &[String]) -> String {
    let mut html = format!("<html><head>{}</head><body>", GTM_HEAD);
    for p in paths {
        html.push_str(&format!(r#"<a href="{}{}">{}</a>"#, base, p, p));
    }
    html.push_str("</body></html>");
    html
}

#[tokio::test]
async fn test_crawl_discovers_linked_pages() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let children: Vec<String> = vec!["/page1".into(), "/page2".into(), "/page3".into()];

    mount_page(&mock_server, "/", page_with_links(&base, &children)).await;
    for child in &children {
        mount_page(&mock_server, child, page_with_links(&base, &children)).await;
    }

    let source = FetchConfig::default().build_source().unwrap();
    let crawler = Crawler::new(source).with_common_paths(false).with_max_pages(4);
    let summary = crawler.crawl(&base).await.unwrap();

    assert_eq!(summary.pages_analyzed, 4);
    assert_eq!(summary.successful_analysis, 4);
    assert_eq!(summary.pages_with_gtm, 4);
    assert_eq!(summary.coverage_percent, 100);
    assert_eq!(summary.gtm_containers, vec!["GTM-MOCK123".to_string()]);
    assert!(
        summary
            .page_results
            .iter()
            .all(|p| p.ga4_confidence == Ga4Confidence::Inferred)
    );
}

#[tokio::test]
async fn test_single_page_budget_with_many_links() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let children: Vec<String> = (1..=10).map(|i| format!("/page{}", i)).collect();
    mount_page(&mock_server, "/", page_with_links(&base, &children)).await;

    let source = FetchConfig::default().build_source().unwrap();
    let summary = Crawler::new(source)
        .with_max_pages(1)
        .crawl(&base)
        .await
        .unwrap();

    assert_eq!(summary.pages_analyzed, 1);
    assert!(summary.estimated_pages_remaining > 0);
}

#[tokio::test]
async fn test_server_error_page_is_recorded_and_crawl_continues() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let children: Vec<String> = vec!["/broken".into(), "/fine".into(), "/also-fine".into()];

    mount_page(&mock_server, "/", page_with_links(&base, &children)).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/fine", page_with_links(&base, &children)).await;
    mount_page(&mock_server, "/also-fine", page_with_links(&base, &children)).await;

    let source = FetchConfig::default().build_source().unwrap();
    let summary = Crawler::new(Arc::clone(&source))
        .with_common_paths(false)
        .with_max_pages(4)
        .crawl(&base)
        .await
        .unwrap();

    assert_eq!(summary.pages_analyzed, 4);
    assert_eq!(summary.pages_with_errors, 1);
    assert_eq!(summary.successful_analysis, 3);
    assert!(summary.error_pages[0].url.ends_with("/broken"));
    assert!(summary.error_pages[0].error.contains("500"));
    let last = summary.page_results.last().unwrap();
    assert!(last.url.ends_with("/also-fine"));
    assert_eq!(last.status, PageStatus::Success);
}
