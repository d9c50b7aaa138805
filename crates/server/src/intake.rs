//! Intake surface: inquiry analysis and confirmed intake creation.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use freeflow_agent::intake::{self, IntakeResult};
use freeflow_core::audit::TraceId;

use crate::accounts::resolve_owner;
use crate::pipeline::{self, PipelineError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/intake/parse-email", post(parse_email))
        .route("/intake/create-manual", post(create_manual))
}

#[derive(Debug, Deserialize)]
struct IntakeInput {
    raw_text: String,
}

#[derive(Debug, Serialize)]
struct IntakeResponse {
    #[serde(flatten)]
    result: IntakeResult,
    is_fallback: bool,
    trace_id: String,
}

/// Run the intake agent over a raw inquiry. Nothing is persisted beyond the
/// audit event; the caller confirms via `create-manual` once satisfied.
async fn parse_email(
    State(state): State<AppState>,
    Json(input): Json<IntakeInput>,
) -> Result<Json<IntakeResponse>, PipelineError> {
    let trace = TraceId::generate();

    let outcome = intake::process_inquiry(state.llm.as_ref(), &input.raw_text).await;
    pipeline::log_intake_analysis(&state.db_pool, &trace, &outcome).await?;

    Ok(Json(IntakeResponse {
        is_fallback: outcome.is_fallback(),
        result: outcome.payload,
        trace_id: trace.0,
    }))
}

#[derive(Debug, Serialize)]
struct IntakeCreateResponse {
    message: &'static str,
    project_id: String,
    client_id: String,
}

/// Create (or reuse) the client and create the project from a confirmed
/// intake record. Requires the caller identity header.
async fn create_manual(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(result): Json<IntakeResult>,
) -> Result<Json<IntakeCreateResponse>, PipelineError> {
    let owner = resolve_owner(&state, &headers).await?;
    let trace = TraceId::generate();

    let committed =
        pipeline::commit_manual_intake(&state.db_pool, &owner.id, &result, &trace).await?;

    Ok(Json(IntakeCreateResponse {
        message: "Project created successfully",
        project_id: committed.project_id.0,
        client_id: committed.client_id.0,
    }))
}
