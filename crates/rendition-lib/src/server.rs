//! HTTP API for the rendition service.
//!
//! ```text
//! POST /api/v1/generate   RenderRequest JSON → raw bytes (Content-Type from engine)
//! GET  /api/v1/engines    registered engines
//! GET  /health            liveness
//! ```
//!
//! CORS-permissive so browser front ends on other origins can call it.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::debug;

use rendition_core::types::{EngineId, RenderRequest};
use rendition_core::validate::RenderOptionsInput;

use crate::error::RenderError;
use crate::service::GenerationService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GenerationService>,
}

/// Build the axum router around a shared [`GenerationService`].
pub fn router(service: Arc<GenerationService>) -> Router {
    Router::new()
        .route("/api/v1/generate", post(generate))
        .route("/api/v1/engines", get(engines))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

// ─── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: &self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        if err.is_client_error() {
            debug!("generate: rejected: {err}");
        }
        match &err {
            RenderError::EngineNotFound(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "engine_not_found", err.to_string())
            }
            RenderError::Validation(_) => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_options",
                err.to_string(),
            ),
            RenderError::Failure { .. } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "render_failed",
                err.to_string(),
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            rejection.body_text(),
        )
    }
}

// ─── Handlers ──────────────────────────────────────────────────────────────

/// Wire shape of a generate call. The engine stays a string here so an
/// unknown identifier is reported as `engine_not_found`, not a parse error.
#[derive(Deserialize)]
struct GenerateBody {
    #[serde(rename = "engine_type", alias = "engine")]
    engine: String,
    #[serde(rename = "source_code", alias = "source_text")]
    source_text: String,
    #[serde(default)]
    options: RenderOptionsInput,
}

async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let engine: EngineId = body
        .engine
        .parse()
        .map_err(|msg: String| ApiError::new(StatusCode::BAD_REQUEST, "engine_not_found", msg))?;

    // An unregistered engine is reported ahead of any option problem.
    state.service.registry().resolve(engine)?;
    let options = body.options.into_options().map_err(RenderError::from)?;

    let request = RenderRequest::new(engine, body.source_text).with_options(options);
    let rendered = state.service.process_request(&request).await?;

    Ok(([(header::CONTENT_TYPE, rendered.media_type)], rendered.bytes).into_response())
}

#[derive(Serialize)]
struct EngineInfo {
    id: EngineId,
    media_type: &'static str,
}

#[derive(Serialize)]
struct EnginesResponse {
    engines: Vec<EngineInfo>,
}

async fn engines(State(state): State<AppState>) -> Json<EnginesResponse> {
    let service = &state.service;
    let engines = service
        .registry()
        .ids()
        .into_iter()
        .filter_map(|id| {
            service
                .media_type(id)
                .ok()
                .map(|media_type| EngineInfo { id, media_type })
        })
        .collect();
    Json(EnginesResponse { engines })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "rendition",
    })
}
