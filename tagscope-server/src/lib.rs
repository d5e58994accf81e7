//! HTTP service for site analysis and GA4 audits.
//!
//! Routes:
//! - `POST /api/analyze-site`: single-page analysis or a site-wide crawl
//! - `POST /api/ga4-audit`: list a token's properties, or audit and score one
//! - `POST /api/score`: score a caller-supplied audit
//! - `GET /health`
//!
//! CORS is open to any origin. Every request gets its own crawl state; the
//! shared state is read-only.

pub mod error;
pub mod routes;

pub use error::ApiError;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tagscope_core::{AdminClient, AdminError};
use tagscope_scanner::{FetchConfig, HtmlSource, ScanError};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to build page fetcher: {0}")]
    Fetcher(#[from] ScanError),

    #[error("Failed to build Admin API client: {0}")]
    Admin(#[from] AdminError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared, read-only handler state
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn HtmlSource>,
    pub admin: Arc<AdminClient>,
}

impl AppState {
    pub fn new(source: Arc<dyn HtmlSource>, admin: AdminClient) -> Self {
        Self {
            source,
            admin: Arc::new(admin),
        }
    }

    /// State for a configured deployment: pages come through the rendering
    /// proxy when the fetch config carries credentials
    pub fn from_config(
        fetch: &FetchConfig,
        admin_api_base: Option<&str>,
    ) -> Result<Self, ServerError> {
        let source = fetch.build_source()?;
        let mut admin = AdminClient::new()?;
        if let Some(base) = admin_api_base {
            admin = admin.with_api_base(base);
        }
        Ok(Self::new(source, admin))
    }
}

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/analyze-site",
            post(routes::analyze_site)
                .options(routes::options)
                .fallback(routes::method_not_allowed),
        )
        .route(
            "/api/ga4-audit",
            post(routes::ga4_audit)
                .options(routes::options)
                .fallback(routes::method_not_allowed),
        )
        .route(
            "/api/score",
            post(routes::score)
                .options(routes::options)
                .fallback(routes::method_not_allowed),
        )
        .route("/health", get(routes::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}
