use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_PROXY_ENDPOINT: &str = "https://app.scrapingbee.com/api/v1/";
const USER_AGENT: &str = "Tagscope/0.1 (https://github.com/trapdoorsec/tagscope)";
const ERROR_BODY_LIMIT: usize = 500;

/// Anything that can hand back the HTML for a URL.
///
/// Implementations must bound each call with their own timeout; the crawler
/// has no whole-crawl deadline.
#[async_trait]
pub trait HtmlSource: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

/// Credentials and endpoint for a headless rendering proxy
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub endpoint: String,
    pub api_key: String,
    pub render_js: bool,
}

impl ProxyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_PROXY_ENDPOINT.to_string(),
            api_key: api_key.into(),
            render_js: true,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub proxy: Option<ProxyConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
            proxy: None,
        }
    }
}

impl FetchConfig {
    /// Build the source this config describes: the rendering proxy when
    /// credentials are present, a plain HTTP fetch otherwise
    pub fn build_source(&self) -> Result<Arc<dyn HtmlSource>> {
        match self.proxy {
            Some(ref proxy) => Ok(Arc::new(RenderProxy::new(self, proxy.clone())?)),
            None => Ok(Arc::new(DirectFetcher::new(self)?)),
        }
    }

    fn client(&self) -> Result<Client> {
        let client = Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .connect_timeout(self.timeout / 2)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(client)
    }
}

/// Fetches pages straight from the target site. No JavaScript is run, so
/// tags injected at runtime are invisible to it.
pub struct DirectFetcher {
    client: Client,
}

impl DirectFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: config.client()?,
        })
    }
}

#[async_trait]
impl HtmlSource for DirectFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        debug!("Fetching {} directly", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(e, url))?;
        read_body(response, url).await
    }
}

/// Fetches rendered HTML through a ScrapingBee-compatible proxy
pub struct RenderProxy {
    client: Client,
    proxy: ProxyConfig,
}

impl RenderProxy {
    pub fn new(config: &FetchConfig, proxy: ProxyConfig) -> Result<Self> {
        Ok(Self {
            client: config.client()?,
            proxy,
        })
    }
}

#[async_trait]
impl HtmlSource for RenderProxy {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        debug!("Fetching {} through rendering proxy", url);
        let render_js = if self.proxy.render_js { "true" } else { "false" };
        let response = self
            .client
            .get(&self.proxy.endpoint)
            .query(&[
                ("api_key", self.proxy.api_key.as_str()),
                ("url", url),
                ("render_js", render_js),
            ])
            .send()
            .await
            .map_err(|e| classify(e, url))?;
        read_body(response, url).await
    }
}

fn classify(error: reqwest::Error, url: &str) -> ScanError {
    if error.is_timeout() {
        ScanError::Timeout(url.to_string())
    } else {
        ScanError::HttpError(error)
    }
}

async fn read_body(response: reqwest::Response, url: &str) -> Result<String> {
    let status = response.status();
    let body = response.text().await.map_err(|e| classify(e, url))?;

    if !status.is_success() {
        return Err(ScanError::Upstream {
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        });
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    #[tokio::test]
    async fn test_direct_fetch_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let fetcher = DirectFetcher::new(&FetchConfig::default()).unwrap();
        let html = fetcher.fetch_html(&mock_server.uri()).await.unwrap();
        assert_eq!(html, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_direct_fetch_non_2xx_is_upstream_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock_server)
            .await;

        let fetcher = DirectFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch_html(&mock_server.uri()).await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(503));
        assert!(err.to_string().contains("maintenance"));
    }

    #[tokio::test]
    async fn test_render_proxy_sends_key_url_and_render_flag() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/"))
            .and(query_param("api_key", "secret"))
            .and(query_param("url", "https://example.com/about"))
            .and(query_param("render_js", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rendered</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let proxy = ProxyConfig::new("secret").with_endpoint(format!("{}/api/v1/", mock_server.uri()));
        let source = RenderProxy::new(&FetchConfig::default(), proxy).unwrap();
        let html = source.fetch_html("https://example.com/about").await.unwrap();
        assert_eq!(html, "<html>rendered</html>");
    }

    #[tokio::test]
    async fn test_slow_page_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let config = FetchConfig {
            timeout: Duration::from_millis(100),
            ..FetchConfig::default()
        };
        let fetcher = DirectFetcher::new(&config).unwrap();
        let err = fetcher.fetch_html(&mock_server.uri()).await.unwrap_err();
        assert!(matches!(err, ScanError::Timeout(_)));
    }
}
