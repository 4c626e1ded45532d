pub mod config;
pub mod error;
pub mod lookup;
pub mod pdf;
pub mod types;
pub mod util;

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::config::Config;
use crate::error::{ErrorKind, PipelineError};
use crate::pdf::PdfPipeline;
use crate::types::{PdfPayload, PdfRequest};

pub const UNPARSEABLE_BODY_MESSAGE: &str = "No se pudo parsear el body";
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Route not found";

const WELCOME_PAGE: &str = r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>api-pdf</title>
    <style>
        body { font-family: Arial, sans-serif; padding: 20px; }
        .container { max-width: 600px; margin: 0 auto; text-align: center; }
    </style>
</head>
<body>
    <div class="container">
        <h1>api-pdf</h1>
        <p><strong>El servicio est&aacute; corriendo correctamente.</strong></p>
        <p>Env&iacute;a un <code>POST /pdf</code> con im&aacute;genes en base64 y texto para generar un PDF.</p>
    </div>
</body>
</html>
"#;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    pipeline: PdfPipeline,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let pipeline =
            PdfPipeline::new(config.scratch_dir.clone()).with_max_images(config.max_images);
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .route("/", get(welcome))
        .route("/pdf", post(render_pdf))
        .route("/cortecsj", get(lookup_cortecsj))
        .fallback(route_not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

/// Install the global subscriber. Logs go to `log_file` when given,
/// otherwise to stdout. Calling this more than once is a no-op.
pub fn init_tracing(log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "api_pdf=info,tower_http=info".into());

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init();
        }
    }
    Ok(())
}

async fn welcome() -> Html<&'static str> {
    tracing::info!("welcome page requested");
    Html(WELCOME_PAGE)
}

async fn render_pdf(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    // The body is JSON whatever the declared content type.
    let body = body.map_err(ApiError::from_rejection)?;
    let payload: PdfPayload = serde_json::from_slice(&body).map_err(|err| {
        tracing::warn!(error = %err, "could not parse body");
        ApiError::UnparseableBody
    })?;
    let request = PdfRequest::from(payload);
    tracing::info!(
        items = request.items.len(),
        images = request.image_count(),
        "rendering pdf"
    );

    let pipeline = state.pipeline.clone();
    let job = tokio::task::spawn_blocking(move || pipeline.run(&request));
    let timeout = state.config.request_timeout();
    let document = tokio::time::timeout(timeout, job)
        .await
        .map_err(|_| ApiError::Timeout(timeout))?
        .map_err(|err| ApiError::Internal(err.to_string()))??;

    Ok(([(header::CONTENT_TYPE, "application/pdf")], document).into_response())
}

async fn lookup_cortecsj(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let value = lookup::read_json_file(&state.config.lookup_file)
        .await
        .map_err(|err| ApiError::Lookup(err.to_string()))?;
    Ok(Json(value))
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No se pudo parsear el body")]
    UnparseableBody,
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("Route not found")]
    RouteNotFound,
    #[error("{0}")]
    Lookup(String),
    #[error("rendering did not finish within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn from_rejection(rejection: BytesRejection) -> Self {
        tracing::warn!(error = %rejection.body_text(), "could not read body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::UnparseableBody
        }
    }
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::UnparseableBody => message(StatusCode::BAD_REQUEST, UNPARSEABLE_BODY_MESSAGE),
            ApiError::PayloadTooLarge => message(StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            ApiError::RouteNotFound => message(StatusCode::NOT_FOUND, ROUTE_NOT_FOUND_MESSAGE),
            ApiError::Lookup(err) => {
                tracing::warn!(error = %err, "lookup file unavailable");
                message(StatusCode::BAD_REQUEST, err)
            }
            ApiError::Pipeline(err) if err.kind == ErrorKind::MalformedRequest => {
                message(StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Pipeline(_) | ApiError::Timeout(_) | ApiError::Internal(_) => {
                tracing::error!(error = %self, "pdf generation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}
