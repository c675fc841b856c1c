//! HTTP shell around `SummaryService`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{ErrorResponse, SummaryRequest, SummaryResponse};
use crate::error::{ExtractionFailure, RetrievalError, ScrapeError};
use crate::service::SummaryService;

/// Scrape failure rendered as a JSON error body.
pub struct ApiError(ScrapeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

pub fn status_for(err: &ScrapeError) -> StatusCode {
    match err {
        ScrapeError::Extraction(ExtractionFailure::Blocked { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        ScrapeError::Extraction(ExtractionFailure::SectionNotFound { .. }) => StatusCode::NOT_FOUND,
        ScrapeError::Extraction(ExtractionFailure::EmptyRegion { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        ScrapeError::Retrieval(RetrievalError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        ScrapeError::Retrieval(_) | ScrapeError::NoProviders => StatusCode::BAD_GATEWAY,
    }
}

impl From<ScrapeError> for ApiError {
    fn from(err: ScrapeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::from(&self.0))).into_response()
    }
}

pub fn router(service: Arc<SummaryService>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ping", get(ping))
        .route("/job-summary", post(job_summary))
        .route("/upwork-summary", post(job_summary))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "pong": true }))
}

async fn job_summary(
    State(service): State<Arc<SummaryService>>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = service.summarize(&request.apply_url).await?;
    Ok(Json(SummaryResponse::new(&request, summary)))
}

pub async fn serve(service: Arc<SummaryService>, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, strategies = ?service.strategies(), "listening");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Strategy;
    use crate::providers::RetrievalProvider;
    use crate::testing::{posting_html, CannedFetch, MockProvider, CHALLENGE_HTML};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(provider: MockProvider) -> Router {
        let chain: Vec<Arc<dyn RetrievalProvider>> = vec![Arc::new(provider)];
        router(Arc::new(SummaryService::new(chain, Duration::from_secs(5))))
    }

    fn summary_request(path: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"apply_url":"https://www.upwork.com/jobs/~01abc","job_id":"7"}"#,
            ))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoints() {
        let app = app(MockProvider::html(Strategy::Static, ""));
        let response = app
            .clone()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));

        let response = app
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!({ "pong": true }));
    }

    #[tokio::test]
    async fn returns_summary() {
        let app = app(MockProvider::html(Strategy::Static, &posting_html(&["Hello", "World"])));
        let response = app.oneshot(summary_request("/job-summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["job_id"], "7");
        assert_eq!(body["summary"], "Hello\n\nWorld");
        assert_eq!(body["paragraphs"], json!(["Hello", "World"]));
        assert_eq!(body["strategy"], "static");
    }

    #[tokio::test]
    async fn legacy_route_and_block_status() {
        let app = app(MockProvider::new(
            Strategy::ProxyRendered,
            CannedFetch::Challenge {
                html: CHALLENGE_HTML.into(),
                status: 403,
            },
        ));
        let response = app.oneshot(summary_request("/upwork-summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["error"], "blocked");
    }

    #[tokio::test]
    async fn timeouts_map_to_gateway_timeout() {
        let app = app(MockProvider::new(Strategy::Static, CannedFetch::Timeout));
        let response = app.oneshot(summary_request("/job-summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json_body(response).await["error"], "timeout");
    }

    #[test]
    fn content_failures_map_to_distinct_statuses() {
        let missing = ScrapeError::from(ExtractionFailure::SectionNotFound {
            strategy: Strategy::RenderedJs,
            tried: vec![],
        });
        let empty = ScrapeError::from(ExtractionFailure::EmptyRegion {
            strategy: Strategy::RenderedJs,
            tried: vec![],
        });
        let reset = ScrapeError::from(RetrievalError::transport("https://x", "reset"));
        assert_eq!(status_for(&missing), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&empty), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&reset), StatusCode::BAD_GATEWAY);
    }
}
