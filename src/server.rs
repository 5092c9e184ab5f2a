//! HTTP endpoint exposing the scraper as `GET /search?q=<term>`.

use crate::amazon::{AmazonSearch, ProductRecord, ScrapeError, Scraper};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Errors reported to HTTP callers as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `q` parameter is missing or blank.
    #[error("Search term is required")]
    Validation,

    /// The scrape could not be carried out at all.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ScrapeError> for ApiError {
    fn from(err: ScrapeError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

/// Builds the router. Image saving is always off for API requests.
pub fn router<C>(scraper: Scraper<C>) -> Router
where
    C: AmazonSearch + 'static,
{
    let scraper = Arc::new(scraper.without_images());

    Router::new()
        .route("/search", get(search::<C>))
        .route("/api/search", get(search::<C>))
        .route("/health", get(|| async { "ok" }))
        .with_state(scraper)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        }))
}

async fn search<C>(
    State(scraper): State<Arc<Scraper<C>>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<ProductRecord>>, ApiError>
where
    C: AmazonSearch + 'static,
{
    let term = params.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(ApiError::Validation);
    }

    info!("Search request: {:?}", term);
    let products = scraper.scrape(term).await.map_err(|e| {
        error!("Error in search: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(products))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    error!("Handler panicked: {}", message);
    ApiError::Internal(message).into_response()
}
