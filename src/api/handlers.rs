// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use super::AppState;
use crate::core::StatsSnapshot;
use crate::error::MachineError;
use crate::machine::{Reading, Status};

#[derive(Debug, Deserialize)]
pub(super) struct StatusRequest {
    status: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    current_status: Status,
    readings_stored: usize,
    #[serde(flatten)]
    stats: StatsSnapshot,
}

fn failure(code: StatusCode, message: impl Into<String>) -> Response {
    (code, Json(json!({ "success": false, "error": message.into() }))).into_response()
}

fn internal(e: impl std::fmt::Display) -> Response {
    error!("Request failed: {}", e);
    failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Run store and state machine work on the blocking pool
async fn run_blocking<F>(state: AppState, work: F) -> Response
where
    F: FnOnce(&AppState) -> Response + Send + 'static,
{
    match tokio::task::spawn_blocking(move || work(&state)).await {
        Ok(response) => response,
        Err(e) => internal(e),
    }
}

pub(super) async fn get_status(State(state): State<AppState>) -> Response {
    run_blocking(state, |state| match state.store.last() {
        Ok(Some(reading)) => Json(json!({ "success": true, "data": reading })).into_response(),
        Ok(None) => failure(StatusCode::NOT_FOUND, "No current data available"),
        Err(e) => internal(e),
    })
    .await
}

pub(super) async fn update_status(
    State(state): State<AppState>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Response {
    let raw = match payload {
        Ok(Json(StatusRequest { status: Some(raw) })) => raw,
        Ok(_) => return failure(StatusCode::BAD_REQUEST, "Status is required"),
        Err(rejection) => {
            debug!("Unreadable status request: {}", rejection);
            return failure(StatusCode::BAD_REQUEST, "Status is required");
        }
    };

    let requested: Status = match raw.parse() {
        Ok(status) => status,
        Err(_) => {
            return failure(
                StatusCode::BAD_REQUEST,
                format!("Invalid status. Allowed values: {}", Status::allowed_values()),
            )
        }
    };

    run_blocking(state, move |state| apply_status(state, requested)).await
}

/// Validate `requested` against the machine and record it as a new reading
/// carrying the latest temperature and speed
fn apply_status(state: &AppState, requested: Status) -> Response {
    let latest = match state.store.last() {
        Ok(Some(reading)) => reading,
        Ok(None) => {
            return failure(
                StatusCode::BAD_REQUEST,
                "Cannot update status: no current data available",
            )
        }
        Err(e) => return internal(e),
    };

    let store = &state.store;
    let result = state.machine.commit(
        |_| requested,
        |from, to| {
            if from == to {
                return Ok(None);
            }
            let base = store.last()?.unwrap_or_else(|| latest.clone());
            store
                .append(Reading::now(base.temperature, base.speed, to))
                .map(Some)
        },
    );

    match result {
        Ok((status, Some(reading))) => {
            info!("Status changed to {} by request", status);
            Json(json!({ "success": true, "data": reading })).into_response()
        }
        Ok((_, None)) => Json(json!({ "success": true, "data": latest })).into_response(),
        Err(MachineError::InvalidTransition(e)) => {
            debug!("Rejected status request: {}", e);
            failure(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => internal(e),
    }
}

pub(super) async fn get_data(State(state): State<AppState>) -> Response {
    run_blocking(state, |state| {
        let current_status = state.machine.current_status();
        let timestamp = match state.store.last() {
            Ok(reading) => reading.map(|r| r.timestamp),
            Err(e) => return internal(e),
        };

        match state.metrics.latest() {
            Ok(Some(metrics)) => Json(json!({
                "success": true,
                "processed_data": metrics,
                "current_status": current_status,
                "timestamp": timestamp,
            }))
            .into_response(),
            Ok(None) => Json(json!({
                "success": false,
                "error": "No data available",
                "current_status": current_status,
                "timestamp": timestamp,
            }))
            .into_response(),
            Err(e) => internal(e),
        }
    })
    .await
}

pub(super) async fn health(State(state): State<AppState>) -> Response {
    run_blocking(state, |state| {
        let readings_stored = match state.store.len() {
            Ok(n) => n,
            Err(e) => return internal(e),
        };

        Json(HealthResponse {
            status: "ok",
            version: crate::VERSION,
            current_status: state.machine.current_status(),
            readings_stored,
            stats: state.stats.snapshot(),
        })
        .into_response()
    })
    .await
}

pub(super) async fn not_found() -> Response {
    failure(StatusCode::NOT_FOUND, "Resource not found")
}
