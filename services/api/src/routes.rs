use crate::infra::AppState;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use btcmi::engines::EngineError;
use btcmi::error::AppError;
use btcmi::schema::SchemaKind;
use btcmi::RunPayload;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/run", post(run_endpoint))
        .route("/validate/:schema_name", post(validate_endpoint))
        .route("/healthz", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Acquire);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

/// Score a payload. Reports are returned, never persisted.
pub(crate) async fn run_endpoint(
    Extension(state): Extension<AppState>,
    Json(document): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let payload = RunPayload::from_value(document.clone())?;
    let mode = state
        .registry
        .resolve_mode(&payload)
        .map_err(EngineError::from)?;
    state.schemas.validate(SchemaKind::Input, &document)?;

    let registry = Arc::clone(&state.registry);
    let envelope =
        tokio::task::spawn_blocking(move || registry.run_mode(mode, &payload, None, None))
            .await
            .map_err(|err| AppError::Server(axum::Error::new(err)))??;

    info!(%mode, overall = envelope.overall_signal(), "run served");
    Ok(Json(envelope.to_value()?))
}

pub(crate) async fn validate_endpoint(
    Extension(state): Extension<AppState>,
    Path(schema_name): Path<String>,
    Json(document): Json<Value>,
) -> Result<Json<Value>, AppError> {
    state.schemas.validate_named(&schema_name, &document)?;
    Ok(Json(json!({ "valid": true })))
}
