//! Directory surface: auth, clients, and projects.
//!
//! Authentication is the plaintext-password MVP carried over from the
//! original product; it exists so records have owners, not as a security
//! layer.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use freeflow_core::audit::TraceId;
use freeflow_core::domain::client::{Client, ClientId};
use freeflow_core::domain::contract::Contract;
use freeflow_core::domain::invoice::Invoice;
use freeflow_core::domain::project::{Project, ProjectId};
use freeflow_core::domain::user::{User, UserId};
use freeflow_core::flows::PipelineEngine;
use freeflow_db::repositories::{
    ClientRepository, ContractRepository, InvoiceRepository, ProjectRepository,
    SqlClientRepository, SqlContractRepository, SqlInvoiceRepository, SqlProjectRepository,
    SqlUserRepository, UserRepository,
};

use crate::pipeline::{self, require_user_header, PipelineError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/{id}", get(get_client))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/{id}", get(get_project))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    message: &'static str,
    user_id: String,
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, PipelineError> {
    let users = SqlUserRepository::new(state.db_pool.clone());

    if users.find_by_email(&request.email).await?.is_some() {
        return Err(PipelineError::BadRequest("email already registered".to_owned()));
    }

    let user = User {
        id: UserId(Uuid::new_v4().to_string()),
        name: request.name,
        email: request.email,
        password: request.password,
        created_at: Utc::now(),
    };
    users.save(user.clone()).await?;

    Ok(Json(RegisterResponse { message: "User registered successfully", user_id: user.id.0 }))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    message: &'static str,
    user_id: String,
    name: String,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, PipelineError> {
    let users = SqlUserRepository::new(state.db_pool.clone());

    let user = users.find_by_email(&request.email).await?.ok_or(PipelineError::Unauthorized)?;
    if user.password != request.password {
        return Err(PipelineError::Unauthorized);
    }

    Ok(Json(LoginResponse { message: "Login successful", user_id: user.id.0, name: user.name }))
}

async fn list_clients(
    State(state): State<AppState>,
) -> Result<Json<Vec<Client>>, PipelineError> {
    let clients = SqlClientRepository::new(state.db_pool.clone()).list().await?;
    Ok(Json(clients))
}

#[derive(Debug, Deserialize)]
struct ClientCreateRequest {
    name: String,
    email: String,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

async fn create_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ClientCreateRequest>,
) -> Result<Json<Client>, PipelineError> {
    let owner = resolve_owner(&state, &headers).await?;

    let client = Client {
        id: ClientId(Uuid::new_v4().to_string()),
        name: request.name,
        email: request.email,
        company: request.company,
        phone: request.phone,
        owner_id: owner.id,
        created_at: Utc::now(),
    };
    SqlClientRepository::new(state.db_pool.clone()).save(client.clone()).await?;

    Ok(Json(client))
}

async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Client>, PipelineError> {
    SqlClientRepository::new(state.db_pool.clone())
        .find_by_id(&ClientId(id))
        .await?
        .map(Json)
        .ok_or(PipelineError::NotFound { entity: "client" })
}

async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, PipelineError> {
    let projects = SqlProjectRepository::new(state.db_pool.clone()).list().await?;
    Ok(Json(projects))
}

#[derive(Debug, Deserialize)]
struct ProjectCreateRequest {
    client_id: String,
    title: String,
    description: String,
    #[serde(default)]
    budget: Option<Decimal>,
    #[serde(default)]
    timeline: Option<String>,
}

async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ProjectCreateRequest>,
) -> Result<Json<Project>, PipelineError> {
    let owner = resolve_owner(&state, &headers).await?;
    let trace = TraceId::generate();

    let project = Project {
        id: ProjectId(Uuid::new_v4().to_string()),
        client_id: ClientId(request.client_id),
        title: request.title,
        description: request.description,
        budget: request.budget,
        timeline: request.timeline,
        status: PipelineEngine.initial_status(),
        owner_id: owner.id,
        created_at: Utc::now(),
    };
    pipeline::commit_project(&state.db_pool, &project, &trace).await?;

    Ok(Json(project))
}

#[derive(Debug, Serialize)]
struct ProjectDetailResponse {
    #[serde(flatten)]
    project: Project,
    contracts: Vec<Contract>,
    invoices: Vec<Invoice>,
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetailResponse>, PipelineError> {
    let project_id = ProjectId(id);
    let project = SqlProjectRepository::new(state.db_pool.clone())
        .find_by_id(&project_id)
        .await?
        .ok_or(PipelineError::NotFound { entity: "project" })?;

    let contracts =
        SqlContractRepository::new(state.db_pool.clone()).list_for_project(&project_id).await?;
    let invoices =
        SqlInvoiceRepository::new(state.db_pool.clone()).list_for_project(&project_id).await?;

    Ok(Json(ProjectDetailResponse { project, contracts, invoices }))
}

/// Resolve the `X-User-Id` header to a stored user. A well-formed header
/// naming a missing user is a 404, not a 400.
pub(crate) async fn resolve_owner(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<User, PipelineError> {
    let user_id = require_user_header(headers)?;
    SqlUserRepository::new(state.db_pool.clone())
        .find_by_id(&user_id)
        .await?
        .ok_or(PipelineError::NotFound { entity: "user" })
}
