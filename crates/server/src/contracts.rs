//! Contract surface: generation, sending, status, and PDF download.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use freeflow_agent::contract;
use freeflow_core::audit::TraceId;
use freeflow_core::domain::contract::{Contract, ContractId, ContractStatus};
use freeflow_core::domain::project::ProjectId;
use freeflow_db::repositories::{
    ClientRepository, ContractRepository, ProjectRepository, SqlClientRepository,
    SqlContractRepository, SqlProjectRepository, SqlUserRepository, UserRepository,
};

use crate::pdf::attachment_filename;
use crate::pipeline::{self, PipelineError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/contracts/generate", post(generate))
        .route("/contracts/send", post(send))
        .route("/contracts/status/{id}", get(status))
        .route("/contracts/{id}/pdf", get(download_pdf))
}

#[derive(Debug, Deserialize)]
struct ContractGenerateRequest {
    project_id: String,
    // Reserved for template selection; a single agreement template exists today.
    #[serde(default)]
    #[allow(dead_code)]
    template_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ContractResponse {
    #[serde(flatten)]
    contract: Contract,
    is_fallback: bool,
    trace_id: String,
}

/// Generate contract variables for a project and persist the draft. The
/// project, its client, and its owning user must all exist; the agent call
/// itself cannot fail the request.
async fn generate(
    State(state): State<AppState>,
    Json(request): Json<ContractGenerateRequest>,
) -> Result<Json<ContractResponse>, PipelineError> {
    let trace = TraceId::generate();
    let project_id = ProjectId(request.project_id);

    let project = SqlProjectRepository::new(state.db_pool.clone())
        .find_by_id(&project_id)
        .await?
        .ok_or(PipelineError::NotFound { entity: "project" })?;
    let client = SqlClientRepository::new(state.db_pool.clone())
        .find_by_id(&project.client_id)
        .await?
        .ok_or(PipelineError::NotFound { entity: "client" })?;
    let freelancer = SqlUserRepository::new(state.db_pool.clone())
        .find_by_id(&project.owner_id)
        .await?
        .ok_or(PipelineError::NotFound { entity: "user" })?;

    let outcome =
        contract::generate_variables(state.llm.as_ref(), &project, &client, &freelancer).await;
    let contract = pipeline::commit_contract(&state.db_pool, &project_id, &outcome, &trace).await?;

    Ok(Json(ContractResponse {
        contract,
        is_fallback: outcome.is_fallback(),
        trace_id: trace.0,
    }))
}

#[derive(Debug, Deserialize)]
struct ContractSendRequest {
    contract_id: String,
}

#[derive(Debug, Serialize)]
struct ContractSendResponse {
    message: &'static str,
    contract_id: String,
}

/// Hand the contract to the signature provider (mock: status only).
async fn send(
    State(state): State<AppState>,
    Json(request): Json<ContractSendRequest>,
) -> Result<Json<ContractSendResponse>, PipelineError> {
    let contracts = SqlContractRepository::new(state.db_pool.clone());
    let mut contract = contracts
        .find_by_id(&ContractId(request.contract_id.clone()))
        .await?
        .ok_or(PipelineError::NotFound { entity: "contract" })?;

    contract.status = ContractStatus::AwaitingSignature;
    contracts.save(contract).await?;

    Ok(Json(ContractSendResponse {
        message: "Contract sent for signature",
        contract_id: request.contract_id,
    }))
}

async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Contract>, PipelineError> {
    SqlContractRepository::new(state.db_pool.clone())
        .find_by_id(&ContractId(id))
        .await?
        .map(Json)
        .ok_or(PipelineError::NotFound { entity: "contract" })
}

async fn download_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, PipelineError> {
    let contract = SqlContractRepository::new(state.db_pool.clone())
        .find_by_id(&ContractId(id))
        .await?
        .ok_or(PipelineError::NotFound { entity: "contract" })?;

    let rendered = state
        .pdf
        .render_contract(&contract)
        .await
        .map_err(|error| PipelineError::State(error.to_string()))?;

    Ok(rendered.into_response(&attachment_filename(&contract.id.0)))
}
