//! HTTP surface for the analysis engine.
//!
//! `GET /health`, `GET /status` and `POST /analyze`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};

use crate::error::{ErrorContext, MediatorError, Result};
use crate::models::{content_hash, AnalysisResult};
use crate::pipeline::AnalysisOrchestrator;

/// Header a caller may set to correlate its request with our logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request logging middleware layer
#[derive(Clone)]
pub struct RequestLoggingLayer;

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingService { inner }
    }
}

/// Logs method, path, status and latency of every request.
#[derive(Clone)]
pub struct RequestLoggingService<S> {
    inner: S,
}

impl<S> Service<Request> for RequestLoggingService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let start = std::time::Instant::now();

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = inner.call(req).await?;

            tracing::info!(
                method = %method,
                path = %path,
                status = %response.status().as_u16(),
                duration_ms = %start.elapsed().as_millis(),
                "HTTP request"
            );

            Ok(response)
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub version: String,
}

impl AppState {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self {
            orchestrator,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub request_id: String,
}

impl ErrorResponse {
    /// Error response with a request ID for log correlation.
    pub fn with_request_id(error: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            request_id: request_id.into(),
        }
    }
}

/// A failed request: the error plus the request id it is reported under.
#[derive(Debug)]
pub struct ApiError {
    pub error: MediatorError,
    pub request_id: String,
}

impl ApiError {
    pub fn new(error: MediatorError, context: &ErrorContext) -> Self {
        Self {
            error,
            request_id: context.request_id.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            MediatorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MediatorError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            MediatorError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse::with_request_id(self.error.user_message(), self.request_id);
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub remote_available: bool,
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/analyze", post(analyze))
        .layer(RequestLoggingLayer)
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MediatorError::Config(format!("Failed to bind port {}: {}", port, e)))?;

    tracing::info!(port, "HTTP server listening");

    axum::serve(listener, build_router(state))
        .await
        .map_err(|e| MediatorError::InternalState(format!("HTTP server failed: {}", e)))
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        remote_available: state.orchestrator.is_remote_available(),
        status: state.orchestrator.status_message().to_string(),
        version: state.version.clone(),
    })
}

async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalyzeRequest>,
) -> std::result::Result<Json<AnalysisResult>, ApiError> {
    let context = request_context(&headers);

    if request.text.trim().is_empty() {
        tracing::debug!(request_id = %context.request_id, "Rejected blank analyze request");
        return Err(ApiError::new(
            MediatorError::InvalidInput("blank text".to_string()),
            &context,
        ));
    }

    tracing::debug!(
        request_id = %context.request_id,
        content_hash = %content_hash(&request.text),
        "Analyze request"
    );
    Ok(Json(
        state
            .orchestrator
            .analyze_with_context(&request.text, context)
            .await,
    ))
}

/// Logging context for an HTTP analysis, reusing the caller's request id.
fn request_context(headers: &HeaderMap) -> ErrorContext {
    let context = ErrorContext::new("http_analyze");
    match headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        Some(id) => context.with_request_id(id),
        None => context,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::IntoResponse;
    use tower::ServiceExt;

    use crate::engine::RuleBasedAnalyzer;
    use crate::error::{ErrorContext, MediatorError};
    use crate::models::{AnalysisResult, AnalysisSource, Severity};
    use crate::pipeline::{AnalysisOrchestrator, SIMULATION_STATUS};
    use crate::web::{
        build_router, ApiError, AppState, ErrorResponse, StatusResponse, REQUEST_ID_HEADER,
    };

    fn router() -> axum::Router {
        let orch = AnalysisOrchestrator::rule_based_only(RuleBasedAnalyzer::with_seed(3));
        build_router(AppState::new(Arc::new(orch)))
    }

    fn analyze_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn error_response_with_request_id() {
        let err = ErrorResponse::with_request_id("bad", "req-123");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["request_id"], "req-123");
        assert_eq!(json["error"], "bad");
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn status_reports_simulation_mode() {
        let response = router()
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let status: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert!(!status.remote_available);
        assert_eq!(status.status, SIMULATION_STATUS);
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn analyze_returns_result() {
        let response = router()
            .oneshot(analyze_request(r#"{"text": "Você é um idiota"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let result: AnalysisResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.severity_level, Severity::Critical);
        assert_eq!(result.source, AnalysisSource::Simulation);
        assert!(result.safety_warning.is_some());
    }

    #[tokio::test]
    async fn analyze_rejects_blank_text() {
        let response = router()
            .oneshot(analyze_request(r#"{"text": "   "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!error.request_id.is_empty());
        assert_eq!(
            error.error,
            MediatorError::InvalidInput(String::new()).user_message()
        );
    }

    #[tokio::test]
    async fn rejection_echoes_caller_request_id() {
        let mut request = analyze_request(r#"{"text": ""}"#);
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER, "client-42".parse().unwrap());

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.request_id, "client-42");
    }

    #[tokio::test]
    async fn analyze_rejects_missing_field() {
        let response = router()
            .oneshot(analyze_request(r#"{"message": "oi"}"#))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[test]
    fn errors_map_to_status_codes() {
        let context = ErrorContext::new("test");
        let status = |error| ApiError::new(error, &context).into_response().status();

        assert_eq!(
            status(MediatorError::InvalidInput("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(MediatorError::RateLimited { retry_after_ms: 1 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status(MediatorError::InternalState("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
