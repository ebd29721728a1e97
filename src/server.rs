//! HTTP front end (axum).
//!
//! `POST /` and `POST /analyze-plant` run an analysis; `GET /health` answers
//! liveness probes. Every response carries permissive CORS headers and
//! preflight `OPTIONS` requests are answered by the CORS layer.

use crate::app::Analyzer;
use crate::models::AnalyzeBody;
use crate::{Error, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{
        header::{ACCESS_CONTROL_ALLOW_HEADERS, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::any::Any as PanicPayload;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info, Instrument};
use uuid::Uuid;

pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

/// Builds the router around a shared analyzer.
pub fn router(analyzer: Arc<Analyzer>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ]);

    Router::new()
        .route("/", post(analyze_plant))
        .route("/analyze-plant", post(analyze_plant))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .with_state(analyzer)
}

async fn analyze_plant(
    State(analyzer): State<Arc<Analyzer>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze_plant", %request_id);

    async move {
        let body = match body {
            Ok(body) => body,
            Err(rejection) => return Error::from(rejection).into_response(),
        };
        let body: AnalyzeBody = match serde_json::from_slice(&body) {
            Ok(body) => body,
            Err(e) => return Error::from(e).into_response(),
        };

        match analyzer.analyze(body).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => e.into_response(),
        }
    }
    .instrument(span)
    .await
}

/// Last-resort 500 for a handler panic, with the panic message passed through.
fn handle_panic(panic: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown error occurred".to_string()
    };
    Error::Unexpected(message).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Serves until the listener fails. Dropping an in-flight request (client
/// abort) drops its outbound model call with it.
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Plant analyzer listening on http://{}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}
