//! GA4 configuration scoring.
//!
//! A fixed, ordered rule table is evaluated against a [`Ga4Audit`]. Each rule
//! returns a deduction (zero or negative). The score is `100 + Σ deductions`
//! clamped to `0..=100`. Evaluation is pure: the same audit always yields the
//! same report.

use crate::audit::{Ga4Audit, RetentionPeriod};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Critical,
    Important,
    Moderate,
    Optional,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Critical => "critical",
            Importance::Important => "important",
            Importance::Moderate => "moderate",
            Importance::Optional => "optional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    DataCollection,
    Conversions,
    Integrations,
    Attribution,
    PropertySettings,
}

pub struct ScoreRule {
    pub id: &'static str,
    pub label: &'static str,
    pub category: RuleCategory,
    pub importance: Importance,
    pub suggestion: &'static str,
    /// Points to subtract, as a value `<= 0`
    pub deduction: fn(&Ga4Audit) -> i32,
}

pub const RULES: &[ScoreRule] = &[
    ScoreRule {
        id: "no_data_streams",
        label: "Data streams",
        category: RuleCategory::DataCollection,
        importance: Importance::Critical,
        suggestion: "Create a web or app data stream so the property can collect data.",
        deduction: |a| if a.data_streams.is_empty() { -20 } else { 0 },
    },
    ScoreRule {
        id: "no_key_events",
        label: "Key events",
        category: RuleCategory::Conversions,
        importance: Importance::Critical,
        suggestion: "Mark the actions that matter to your business (purchases, leads, sign-ups) as key events.",
        deduction: |a| if a.key_events.is_empty() { -20 } else { 0 },
    },
    ScoreRule {
        id: "too_many_key_events",
        label: "Key event focus",
        category: RuleCategory::Conversions,
        importance: Importance::Moderate,
        suggestion: "Keep key events to the two or three outcomes you optimize for; demote the rest to regular events.",
        deduction: |a| if a.key_events.len() > 2 { -10 } else { 0 },
    },
    ScoreRule {
        id: "data_retention",
        label: "Data retention",
        category: RuleCategory::PropertySettings,
        importance: Importance::Important,
        suggestion: "Raise event data retention to 14 months so explorations can look back more than two months.",
        deduction: data_retention_deduction,
    },
    ScoreRule {
        id: "no_google_ads_link",
        label: "Google Ads link",
        category: RuleCategory::Integrations,
        importance: Importance::Critical,
        suggestion: "Link Google Ads to import key events and share audiences for bidding.",
        deduction: |a| if a.google_ads_links.is_empty() { -20 } else { 0 },
    },
    ScoreRule {
        id: "enhanced_measurement",
        label: "Enhanced measurement",
        category: RuleCategory::DataCollection,
        importance: Importance::Moderate,
        suggestion: "Turn on enhanced measurement for every web stream to collect scrolls, outbound clicks, site search and downloads.",
        deduction: enhanced_measurement_deduction,
    },
    ScoreRule {
        id: "attribution_model",
        label: "Attribution model",
        category: RuleCategory::Attribution,
        importance: Importance::Moderate,
        suggestion: "Use the data-driven attribution model for reporting.",
        deduction: |a| match a.attribution {
            Some(ref settings) if settings.is_data_driven() => 0,
            _ => -10,
        },
    },
    ScoreRule {
        id: "search_console",
        label: "Search Console",
        category: RuleCategory::Integrations,
        importance: Importance::Optional,
        suggestion: "Link Search Console to see organic search queries alongside GA4 data.",
        deduction: |a| match a.search_console {
            Some(ref sc) if sc.linked && sc.has_data => 0,
            _ => -5,
        },
    },
    ScoreRule {
        id: "bigquery_link",
        label: "BigQuery export",
        category: RuleCategory::Integrations,
        importance: Importance::Optional,
        suggestion: "Link BigQuery to keep raw, unsampled event data beyond the retention window.",
        deduction: |a| if a.big_query_links.is_empty() { -5 } else { 0 },
    },
    ScoreRule {
        id: "industry_category",
        label: "Industry category",
        category: RuleCategory::PropertySettings,
        importance: Importance::Optional,
        suggestion: "Set the industry category to enable benchmarking.",
        deduction: |a| match a.property {
            Some(ref p) if p.has_industry_category() => 0,
            _ => -5,
        },
    },
    ScoreRule {
        id: "time_zone",
        label: "Reporting time zone",
        category: RuleCategory::PropertySettings,
        importance: Importance::Optional,
        suggestion: "Set the reporting time zone to match where your business operates.",
        deduction: |a| match a.property {
            Some(ref p) if p.has_time_zone() => 0,
            _ => -5,
        },
    },
    ScoreRule {
        id: "currency",
        label: "Currency",
        category: RuleCategory::PropertySettings,
        importance: Importance::Optional,
        suggestion: "Set the property currency so revenue reports are in your reporting currency.",
        deduction: |a| match a.property {
            Some(ref p) if p.has_currency() => 0,
            _ => -5,
        },
    },
    ScoreRule {
        id: "custom_dimensions",
        label: "Custom dimensions",
        category: RuleCategory::DataCollection,
        importance: Importance::Optional,
        suggestion: "Register custom dimensions for the event parameters you want to report on.",
        deduction: |a| if a.custom_dimensions.is_empty() { -5 } else { 0 },
    },
];

fn data_retention_deduction(audit: &Ga4Audit) -> i32 {
    match audit.data_retention.as_ref().map(|r| r.event_data_retention) {
        Some(RetentionPeriod::TwoMonths) => -15,
        Some(
            RetentionPeriod::FourteenMonths
            | RetentionPeriod::TwentySixMonths
            | RetentionPeriod::ThirtyEightMonths
            | RetentionPeriod::FiftyMonths,
        ) => 0,
        Some(RetentionPeriod::DataRetentionPeriodUnspecified | RetentionPeriod::Unknown) | None => -20,
    }
}

fn enhanced_measurement_deduction(audit: &Ga4Audit) -> i32 {
    let mut web_streams = audit.data_streams.iter().filter(|s| s.is_web()).peekable();
    if web_streams.peek().is_none() {
        return -10;
    }
    let all_enabled =
        web_streams.all(|s| s.enhanced_measurement.as_ref().is_some_and(|em| em.stream_enabled));
    if all_enabled { 0 } else { -10 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub label: String,
    pub category: RuleCategory,
    pub suggestion: String,
    pub importance: Importance,
    pub points: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionGroups {
    pub critical: Vec<Suggestion>,
    pub important: Vec<Suggestion>,
    pub moderate: Vec<Suggestion>,
    pub optional: Vec<Suggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    NeedsWork,
    Poor,
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=100 => Grade::Excellent,
            70..=89 => Grade::Good,
            50..=69 => Grade::NeedsWork,
            _ => Grade::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent",
            Grade::Good => "Good",
            Grade::NeedsWork => "Needs work",
            Grade::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub score: u8,
    pub grade: Grade,
    pub total_deduction: i32,
    /// Worst first
    pub suggestions: Vec<Suggestion>,
    pub by_importance: SuggestionGroups,
    pub passed: Vec<String>,
}

pub fn score_audit(audit: &Ga4Audit) -> ScoreReport {
    score_with_rules(audit, RULES)
}

pub fn score_with_rules(audit: &Ga4Audit, rules: &[ScoreRule]) -> ScoreReport {
    let mut suggestions = Vec::new();
    let mut passed = Vec::new();

    for rule in rules {
        // Positive values would be bonuses, which the table never grants
        let points = (rule.deduction)(audit).min(0);
        if points == 0 {
            passed.push(rule.label.to_string());
            continue;
        }
        suggestions.push(Suggestion {
            id: rule.id.to_string(),
            label: rule.label.to_string(),
            category: rule.category,
            suggestion: rule.suggestion.to_string(),
            importance: rule.importance,
            points,
        });
    }

    let total_deduction: i32 = suggestions.iter().map(|s| s.points).sum();
    let score = (100 + total_deduction).clamp(0, 100) as u8;

    // Stable: ties keep table order
    suggestions.sort_by_key(|s| s.points);

    let mut by_importance = SuggestionGroups::default();
    for s in &suggestions {
        let group = match s.importance {
            Importance::Critical => &mut by_importance.critical,
            Importance::Important => &mut by_importance.important,
            Importance::Moderate => &mut by_importance.moderate,
            Importance::Optional => &mut by_importance.optional,
        };
        group.push(s.clone());
    }

    ScoreReport {
        score,
        grade: Grade::from_score(score),
        total_deduction,
        suggestions,
        by_importance,
        passed,
    }
}
