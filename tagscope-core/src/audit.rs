//! Typed GA4 property configuration.
//!
//! Field names follow the GA4 Admin API's JSON so API responses deserialize
//! straight into these types. Every section is optional: a section that is
//! absent means "not configured" to the scorer. Unknown enum values land in
//! an `Unknown` variant instead of failing the whole document.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ga4Audit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertySettings>,
    #[serde(default)]
    pub data_streams: Vec<DataStream>,
    #[serde(default)]
    pub key_events: Vec<KeyEvent>,
    #[serde(default)]
    pub custom_dimensions: Vec<CustomDimension>,
    #[serde(default)]
    pub custom_metrics: Vec<CustomMetric>,
    #[serde(default)]
    pub google_ads_links: Vec<GoogleAdsLink>,
    #[serde(default)]
    pub big_query_links: Vec<BigQueryLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_retention: Option<DataRetentionSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<AttributionSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_console: Option<SearchConsoleStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySettings {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
}

impl PropertySettings {
    /// The API reports an unset category as `INDUSTRY_CATEGORY_UNSPECIFIED`
    pub fn has_industry_category(&self) -> bool {
        is_set(&self.industry_category, "INDUSTRY_CATEGORY_UNSPECIFIED")
    }

    pub fn has_time_zone(&self) -> bool {
        is_set(&self.time_zone, "")
    }

    pub fn has_currency(&self) -> bool {
        is_set(&self.currency_code, "")
    }
}

fn is_set(value: &Option<String>, unspecified: &str) -> bool {
    match value.as_deref().map(str::trim) {
        Some("") | None => false,
        Some(v) => v != unspecified,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamType {
    WebDataStream,
    AndroidAppDataStream,
    IosAppDataStream,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStream {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub stream_type: StreamType,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_stream_data: Option<WebStreamData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_measurement: Option<EnhancedMeasurementSettings>,
}

impl DataStream {
    pub fn is_web(&self) -> bool {
        self.stream_type == StreamType::WebDataStream
    }

    /// Stream ID, the last segment of `properties/{p}/dataStreams/{id}`
    pub fn stream_id(&self) -> Option<&str> {
        self.name.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebStreamData {
    #[serde(default)]
    pub measurement_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnhancedMeasurementSettings {
    pub stream_enabled: bool,
    pub scrolls_enabled: bool,
    pub outbound_clicks_enabled: bool,
    pub site_search_enabled: bool,
    pub video_engagement_enabled: bool,
    pub file_downloads_enabled: bool,
    pub page_changes_enabled: bool,
    pub form_interactions_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counting_method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDimension {
    #[serde(default)]
    pub parameter_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetric {
    #[serde(default)]
    pub parameter_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAdsLink {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub customer_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigQueryLink {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionPeriod {
    TwoMonths,
    FourteenMonths,
    TwentySixMonths,
    ThirtyEightMonths,
    FiftyMonths,
    DataRetentionPeriodUnspecified,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRetentionSettings {
    #[serde(default)]
    pub event_data_retention: RetentionPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_user_data_on_new_activity: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_attribution_model: Option<String>,
}

impl AttributionSettings {
    pub fn is_data_driven(&self) -> bool {
        self.reporting_attribution_model
            .as_deref()
            .is_some_and(|m| m.ends_with("DATA_DRIVEN"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConsoleStatus {
    pub linked: bool,
    pub has_data: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_all_missing() {
        let audit: Ga4Audit = serde_json::from_str("{}").unwrap();
        assert_eq!(audit, Ga4Audit::default());
    }

    #[test]
    fn test_unknown_enum_values_do_not_fail() {
        let json = r#"{
            "dataStreams": [{"name": "properties/1/dataStreams/2", "type": "SOMETHING_NEW"}],
            "dataRetention": {"eventDataRetention": "ONE_HUNDRED_MONTHS"}
        }"#;
        let audit: Ga4Audit = serde_json::from_str(json).unwrap();
        assert_eq!(audit.data_streams[0].stream_type, StreamType::Unknown);
        assert_eq!(
            audit.data_retention.unwrap().event_data_retention,
            RetentionPeriod::Unknown
        );
    }

    #[test]
    fn test_unspecified_retention_keeps_api_name() {
        let settings: DataRetentionSettings = serde_json::from_str(
            r#"{"eventDataRetention": "DATA_RETENTION_PERIOD_UNSPECIFIED"}"#,
        )
        .unwrap();
        assert_eq!(
            settings.event_data_retention,
            RetentionPeriod::DataRetentionPeriodUnspecified
        );

        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["eventDataRetention"], "DATA_RETENTION_PERIOD_UNSPECIFIED");
    }

    #[test]
    fn test_admin_api_stream_shape() {
        let json = r#"{
            "name": "properties/123/dataStreams/456",
            "type": "WEB_DATA_STREAM",
            "displayName": "Main site",
            "webStreamData": {"measurementId": "G-ABC123", "defaultUri": "https://example.com"}
        }"#;
        let stream: DataStream = serde_json::from_str(json).unwrap();
        assert!(stream.is_web());
        assert_eq!(stream.stream_id(), Some("456"));
        assert_eq!(stream.web_stream_data.unwrap().measurement_id, "G-ABC123");
    }

    #[test]
    fn test_property_unspecified_values() {
        let property = PropertySettings {
            industry_category: Some("INDUSTRY_CATEGORY_UNSPECIFIED".to_string()),
            time_zone: Some("  ".to_string()),
            currency_code: Some("USD".to_string()),
            ..Default::default()
        };
        assert!(!property.has_industry_category());
        assert!(!property.has_time_zone());
        assert!(property.has_currency());
    }

    #[test]
    fn test_data_driven_models() {
        let ddm = AttributionSettings {
            reporting_attribution_model: Some("PAID_AND_ORGANIC_CHANNELS_DATA_DRIVEN".to_string()),
        };
        let last_click = AttributionSettings {
            reporting_attribution_model: Some("PAID_AND_ORGANIC_CHANNELS_LAST_CLICK".to_string()),
        };
        assert!(ddm.is_data_driven());
        assert!(!last_click.is_data_driven());
        assert!(!AttributionSettings::default().is_data_driven());
    }
}
