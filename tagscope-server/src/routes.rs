use crate::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tagscope_core::{Ga4Audit, ScoreReport, score_audit};
use tagscope_scanner::normalize::with_default_scheme;
use tagscope_scanner::{Crawler, DEFAULT_MAX_PAGES, analyze_page};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    #[default]
    Single,
    Sitewide,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub crawl_mode: CrawlMode,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRequest {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub property_id: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text())))
}

fn required(value: Option<String>, what: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", what)))
}

pub async fn analyze_site(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload)?;
    let url = with_default_scheme(&required(request.url, "URL")?);

    match request.crawl_mode {
        CrawlMode::Single => {
            info!("Single-page analysis requested for {}", url);
            let analysis = analyze_page(state.source.as_ref(), &url).await?;
            Ok(Json(analysis).into_response())
        }
        CrawlMode::Sitewide => {
            let max_pages = request.max_pages.unwrap_or(DEFAULT_MAX_PAGES);
            info!("Site-wide crawl requested for {} (max {} pages)", url, max_pages);
            let summary = Crawler::new(state.source.clone())
                .with_max_pages(max_pages)
                .crawl(&url)
                .await?;
            Ok(Json(summary).into_response())
        }
    }
}

pub async fn ga4_audit(
    State(state): State<AppState>,
    payload: Result<Json<AuditRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = body(payload)?;
    let token = required(request.access_token, "Access token")?;

    let user = state.admin.validate_token(&token).await?;

    let Some(property_id) = request.property_id.filter(|p| !p.trim().is_empty()) else {
        let accounts = state.admin.list_properties(&token).await?;
        info!("Listed {} GA4 accounts", accounts.len());
        return Ok(Json(json!({ "user": user, "accounts": accounts })).into_response());
    };

    let audit = state.admin.fetch_audit(&token, &property_id).await?;
    let score = score_audit(&audit);
    info!("Scored GA4 property {}: {}", property_id, score.score);

    Ok(Json(json!({
        "user": user,
        "propertyId": property_id,
        "audit": audit,
        "score": score,
    }))
    .into_response())
}

pub async fn score(
    payload: Result<Json<Ga4Audit>, JsonRejection>,
) -> Result<Json<ScoreReport>, ApiError> {
    let audit = body(payload)?;
    Ok(Json(score_audit(&audit)))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Plain OPTIONS requests; CORS preflights are answered by the CORS layer
pub async fn options() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn method_not_allowed() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}
