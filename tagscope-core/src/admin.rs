//! Client for the Google Analytics Admin API.
//!
//! Builds a [`Ga4Audit`] from a property's live configuration. The property
//! itself and its data streams are required; every other section is fetched
//! best-effort and left missing when Google refuses it, which the scorer
//! then treats as "not configured".

use crate::audit::{
    AttributionSettings, BigQueryLink, CustomDimension, CustomMetric, DataRetentionSettings,
    DataStream, EnhancedMeasurementSettings, Ga4Audit, GoogleAdsLink, KeyEvent, PropertySettings,
};
use futures::future::join_all;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_ADMIN_API_BASE: &str = "https://analyticsadmin.googleapis.com";
pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const REQUEST_TIMEOUT_SECS: u64 = 15;
const PAGE_SIZE: &str = "200";
const MAX_LIST_PAGES: usize = 100;
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Access token rejected ({status}): {body}")]
    AuthRejected { status: u16, body: String },

    #[error("Admin API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid property ID: {0}")]
    InvalidPropertyId(String),

    #[error("Unexpected Admin API response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AdminError {
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AdminError::AuthRejected { status, .. } | AdminError::Upstream { status, .. } => {
                Some(*status)
            }
            AdminError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub property_summaries: Vec<PropertySummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    #[serde(default)]
    pub property: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl PropertySummary {
    /// Numeric ID, without the `properties/` prefix
    pub fn property_id(&self) -> &str {
        self.property
            .strip_prefix("properties/")
            .unwrap_or(&self.property)
    }
}

/// Accepts `123` or `properties/123` and returns the resource name
pub fn property_resource(property_id: &str) -> Result<String> {
    let trimmed = property_id.trim();
    let id = trimmed.strip_prefix("properties/").unwrap_or(trimmed);
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(AdminError::InvalidPropertyId(property_id.to_string()));
    }
    Ok(format!("properties/{}", id))
}

#[derive(Clone)]
pub struct AdminClient {
    client: Client,
    api_base: String,
    userinfo_url: String,
}

impl AdminClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_base: DEFAULT_ADMIN_API_BASE.to_string(),
            userinfo_url: DEFAULT_USERINFO_URL.to_string(),
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = url.into();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub async fn validate_token(&self, token: &str) -> Result<UserInfo> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(AdminError::AuthRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Every account the token can see, with its properties
    pub async fn list_properties(&self, token: &str) -> Result<Vec<AccountSummary>> {
        self.list(token, "v1beta", "accountSummaries", "accountSummaries")
            .await
    }

    pub async fn fetch_audit(&self, token: &str, property_id: &str) -> Result<Ga4Audit> {
        let property = property_resource(property_id)?;
        info!("Fetching GA4 configuration for {}", property);

        let settings: PropertySettings = self
            .get_json(self.get(token, "v1beta", &property))
            .await?;
        let data_streams: Vec<DataStream> = self
            .list(token, "v1beta", &format!("{}/dataStreams", property), "dataStreams")
            .await?;

        let key_events_path = format!("{}/keyEvents", property);
        let dimensions_path = format!("{}/customDimensions", property);
        let metrics_path = format!("{}/customMetrics", property);
        let ads_path = format!("{}/googleAdsLinks", property);
        let retention_path = format!("{}/dataRetentionSettings", property);
        let attribution_path = format!("{}/attributionSettings", property);
        let bigquery_path = format!("{}/bigQueryLinks", property);

        let (key_events, custom_dimensions, custom_metrics, google_ads_links, retention, attribution, big_query_links) = tokio::join!(
            self.list::<KeyEvent>(token, "v1beta", &key_events_path, "keyEvents"),
            self.list::<CustomDimension>(token, "v1beta", &dimensions_path, "customDimensions"),
            self.list::<CustomMetric>(token, "v1beta", &metrics_path, "customMetrics"),
            self.list::<GoogleAdsLink>(token, "v1beta", &ads_path, "googleAdsLinks"),
            self.get_json::<DataRetentionSettings>(self.get(token, "v1beta", &retention_path)),
            self.get_json::<AttributionSettings>(self.get(token, "v1alpha", &attribution_path)),
            self.list::<BigQueryLink>(token, "v1alpha", &bigquery_path, "bigqueryLinks"),
        );

        let data_streams = self.with_enhanced_measurement(token, data_streams).await;

        Ok(Ga4Audit {
            property: Some(settings),
            data_streams,
            key_events: optional("key events", key_events).unwrap_or_default(),
            custom_dimensions: optional("custom dimensions", custom_dimensions)
                .unwrap_or_default(),
            custom_metrics: optional("custom metrics", custom_metrics).unwrap_or_default(),
            google_ads_links: optional("Google Ads links", google_ads_links).unwrap_or_default(),
            big_query_links: optional("BigQuery links", big_query_links).unwrap_or_default(),
            data_retention: optional("data retention", retention),
            attribution: optional("attribution settings", attribution),
            // Not exposed by the Admin API
            search_console: None,
        })
    }

    async fn with_enhanced_measurement(
        &self,
        token: &str,
        mut streams: Vec<DataStream>,
    ) -> Vec<DataStream> {
        let lookups = streams.iter().map(|stream| async move {
            if !stream.is_web() || stream.name.is_empty() {
                return None;
            }
            let path = format!("{}/enhancedMeasurementSettings", stream.name);
            let result = self
                .get_json::<EnhancedMeasurementSettings>(self.get(token, "v1alpha", &path))
                .await;
            optional("enhanced measurement", result)
        });

        let settings = join_all(lookups).await;
        for (stream, em) in streams.iter_mut().zip(settings) {
            if em.is_some() {
                stream.enhanced_measurement = em;
            }
        }
        streams
    }

    fn get(&self, token: &str, version: &str, resource: &str) -> RequestBuilder {
        let url = format!("{}/{}/{}", self.api_base, version, resource);
        debug!("GET {}", url);
        self.client.get(url).bearer_auth(token)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(AdminError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Collects `key` from every page of a list endpoint
    async fn list<T: DeserializeOwned>(
        &self,
        token: &str,
        version: &str,
        resource: &str,
        key: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        for _ in 0..MAX_LIST_PAGES {
            let mut request = self
                .get(token, version, resource)
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(ref t) = page_token {
                request = request.query(&[("pageToken", t.as_str())]);
            }

            let mut page: serde_json::Value = self.get_json(request).await?;
            if let Some(values) = page.get_mut(key).map(serde_json::Value::take) {
                let batch: Vec<T> = serde_json::from_value(values)?;
                items.extend(batch);
            }

            match page
                .get("nextPageToken")
                .and_then(|t| t.as_str())
                .filter(|t| !t.is_empty())
            {
                Some(next) if seen_tokens.insert(next.to_string()) => {
                    page_token = Some(next.to_string())
                }
                Some(next) => {
                    warn!("{} repeated page token {}, stopping", resource, next);
                    return Ok(items);
                }
                None => return Ok(items),
            }
        }

        warn!("{} still paging after {} pages, stopping", resource, MAX_LIST_PAGES);
        Ok(items)
    }
}

fn optional<T>(section: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Could not fetch {}: {}", section, e);
            None
        }
    }
}

async fn error_body(response: reqwest::Response) -> String {
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_resource_forms() {
        assert_eq!(property_resource("123").unwrap(), "properties/123");
        assert_eq!(property_resource("properties/123").unwrap(), "properties/123");
        assert_eq!(property_resource(" 42 ").unwrap(), "properties/42");
    }

    #[test]
    fn test_property_resource_rejects_garbage() {
        for bad in ["", "properties/", "G-ABC123", "12a", "accounts/1"] {
            assert!(
                matches!(property_resource(bad), Err(AdminError::InvalidPropertyId(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_property_summary_id() {
        let summary = PropertySummary {
            property: "properties/987".to_string(),
            ..Default::default()
        };
        assert_eq!(summary.property_id(), "987");
    }

    #[test]
    fn test_upstream_status() {
        let err = AdminError::AuthRejected {
            status: 401,
            body: String::new(),
        };
        assert_eq!(err.upstream_status(), Some(401));
        assert_eq!(
            AdminError::InvalidPropertyId("x".to_string()).upstream_status(),
            None
        );
    }
}
