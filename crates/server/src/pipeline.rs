//! Transactional pipeline steps.
//!
//! Every state-changing endpoint funnels through one of these helpers: the
//! entity write, the project status update, and the audit event append all
//! happen inside a single SQLite transaction, so a crash mid-step can no
//! longer leave a contract without its status advance or a status advance
//! without its audit record.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use sqlx::{Sqlite, Transaction};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use freeflow_agent::intake::IntakeResult;
use freeflow_agent::{AgentOutcome, AgentSource};
use freeflow_core::audit::{AgentEvent, EventKind, TraceId};
use freeflow_core::domain::client::ClientId;
use freeflow_core::domain::contract::{
    Contract, ContractId, ContractStatus, ContractVariables, SignatureProvider,
};
use freeflow_core::domain::invoice::{Invoice, InvoiceDetails, InvoiceId, InvoiceStatus};
use freeflow_core::domain::project::{Project, ProjectId, ProjectStatus};
use freeflow_core::domain::user::UserId;
use freeflow_core::flows::{PipelineEngine, PipelineEvent, PipelineTransitionError};
use freeflow_db::repositories::RepositoryError;
use freeflow_db::DbPool;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Transition(#[from] PipelineTransitionError),
    #[error("persistence failure: {0}")]
    Repository(#[from] RepositoryError),
    #[error("persistence failure: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("stored state is invalid: {0}")]
    State(String),
    #[error("missing caller identity header `X-User-Id`")]
    MissingIdentity,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("invalid request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Transition(_) => (StatusCode::CONFLICT, self.to_string()),
            Self::MissingIdentity | Self::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::Repository(_) | Self::Database(_) => {
                error!(event_name = "pipeline.persistence_error", error = %self, "pipeline step failed");
                (StatusCode::SERVICE_UNAVAILABLE, "service temporarily unavailable".to_owned())
            }
            Self::Encoding(_) | Self::State(_) => {
                error!(event_name = "pipeline.internal_error", error = %self, "pipeline step failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "operation failed".to_owned())
            }
        };

        (status, Json(ApiError { error: message })).into_response()
    }
}

/// Caller identity for endpoints that create owned records. Plaintext MVP:
/// the header value is a user id, trusted as-is once it resolves.
pub fn require_user_header(headers: &HeaderMap) -> Result<UserId, PipelineError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_owned()))
        .ok_or(PipelineError::MissingIdentity)
}

/// Snapshot payload for audit events. Fallback substitution is recorded so
/// the activity feed reveals LLM outages.
pub fn agent_payload<T: Serialize>(
    entity: &T,
    source: &AgentSource,
) -> Result<serde_json::Value, PipelineError> {
    let mut payload = json!({
        "snapshot": serde_json::to_value(entity)?,
        "fallback": matches!(source, AgentSource::Fallback { .. }),
    });
    if let AgentSource::Fallback { reason } = source {
        payload["fallback_reason"] = json!(reason);
    }
    Ok(payload)
}

async fn insert_event(
    tx: &mut Transaction<'_, Sqlite>,
    event: &AgentEvent,
) -> Result<(), PipelineError> {
    let payload_json = serde_json::to_string(&event.payload)?;
    sqlx::query(
        "INSERT INTO agent_event (id, trace_id, kind, entity_type, entity_id, payload, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&event.id)
    .bind(&event.trace_id.0)
    .bind(event.kind.as_str())
    .bind(&event.entity_type)
    .bind(&event.entity_id)
    .bind(payload_json)
    .bind(event.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn project_status_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    project_id: &ProjectId,
) -> Result<ProjectStatus, PipelineError> {
    let status_str: Option<String> =
        sqlx::query_scalar("SELECT status FROM project WHERE id = ?")
            .bind(&project_id.0)
            .fetch_optional(&mut **tx)
            .await?;

    let status_str = status_str.ok_or(PipelineError::NotFound { entity: "project" })?;
    ProjectStatus::parse(&status_str)
        .ok_or_else(|| PipelineError::State(format!("unknown project status `{status_str}`")))
}

/// Record the analysis produced by `POST /intake/parse-email`. Nothing is
/// created yet; the event trail is the only write, keyed by the trace id.
pub async fn log_intake_analysis(
    pool: &DbPool,
    trace: &TraceId,
    outcome: &AgentOutcome<IntakeResult>,
) -> Result<(), PipelineError> {
    use freeflow_agent::intake::IntakeStatus;

    let kind = match outcome.payload.status {
        IntakeStatus::IntakeComplete => EventKind::IntakeCompleted,
        IntakeStatus::NeedsMoreInfo => EventKind::IntakeNeedsInfo,
    };

    let mut tx = pool.begin().await?;
    let event = AgentEvent::new(
        trace.clone(),
        kind,
        "intake",
        trace.0.clone(),
        agent_payload(&outcome.payload, &outcome.source)?,
    );
    insert_event(&mut tx, &event).await?;
    tx.commit().await?;

    info!(
        event_name = "pipeline.intake.analyzed",
        trace_id = %trace.0,
        fallback = outcome.is_fallback(),
        "intake inquiry analyzed"
    );
    Ok(())
}

pub struct IntakeCommit {
    pub project_id: ProjectId,
    pub client_id: ClientId,
}

/// Create (or reuse) the client and create the project from a confirmed
/// intake record, appending the audit event in the same transaction.
pub async fn commit_manual_intake(
    pool: &DbPool,
    owner: &UserId,
    result: &IntakeResult,
    trace: &TraceId,
) -> Result<IntakeCommit, PipelineError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let existing: Option<String> =
        sqlx::query_scalar("SELECT id FROM client WHERE email = ? ORDER BY created_at ASC")
            .bind(&result.client.email)
            .fetch_optional(&mut *tx)
            .await?;

    let client_id = match existing {
        Some(id) => ClientId(id),
        None => {
            let id = ClientId(Uuid::new_v4().to_string());
            sqlx::query(
                "INSERT INTO client (id, name, email, company, phone, owner_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&id.0)
            .bind(&result.client.name)
            .bind(&result.client.email)
            .bind((!result.client.company.is_empty()).then(|| result.client.company.clone()))
            .bind(None::<String>)
            .bind(&owner.0)
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await?;
            id
        }
    };

    let project = Project {
        id: ProjectId(Uuid::new_v4().to_string()),
        client_id: client_id.clone(),
        title: result.project.title.clone(),
        description: result.project.description.clone(),
        budget: result.project.budget,
        timeline: (!result.project.timeline.is_empty()).then(|| result.project.timeline.clone()),
        status: PipelineEngine.initial_status(),
        owner_id: owner.clone(),
        created_at: now,
    };
    insert_project(&mut tx, &project).await?;

    let event = AgentEvent::new(
        trace.clone(),
        EventKind::IntakeCompleted,
        "project",
        project.id.0.clone(),
        json!({"client_id": client_id.0, "project": serde_json::to_value(&project)?}),
    );
    insert_event(&mut tx, &event).await?;

    tx.commit().await?;

    info!(
        event_name = "pipeline.intake.committed",
        trace_id = %trace.0,
        project_id = %project.id.0,
        client_id = %client_id.0,
        "manual intake created client and project"
    );
    Ok(IntakeCommit { project_id: project.id, client_id })
}

/// Direct project creation (`POST /projects`): insert plus audit event.
pub async fn commit_project(
    pool: &DbPool,
    project: &Project,
    trace: &TraceId,
) -> Result<(), PipelineError> {
    let mut tx = pool.begin().await?;

    let client_exists: Option<String> = sqlx::query_scalar("SELECT id FROM client WHERE id = ?")
        .bind(&project.client_id.0)
        .fetch_optional(&mut *tx)
        .await?;
    if client_exists.is_none() {
        return Err(PipelineError::NotFound { entity: "client" });
    }

    insert_project(&mut tx, project).await?;

    let event = AgentEvent::new(
        trace.clone(),
        EventKind::IntakeCompleted,
        "project",
        project.id.0.clone(),
        serde_json::to_value(project)?,
    );
    insert_event(&mut tx, &event).await?;

    tx.commit().await?;

    info!(
        event_name = "pipeline.project.created",
        trace_id = %trace.0,
        project_id = %project.id.0,
        "project created"
    );
    Ok(())
}

async fn insert_project(
    tx: &mut Transaction<'_, Sqlite>,
    project: &Project,
) -> Result<(), PipelineError> {
    sqlx::query(
        "INSERT INTO project (id, client_id, title, description, budget, timeline, status, owner_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&project.id.0)
    .bind(&project.client_id.0)
    .bind(&project.title)
    .bind(&project.description)
    .bind(project.budget.map(|b| b.to_string()))
    .bind(&project.timeline)
    .bind(project.status.as_str())
    .bind(&project.owner_id.0)
    .bind(project.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Persist a generated contract, advance the project to Contract, and append
/// the `Contract.Sent` event, all in one transaction. The project status is
/// re-read inside the transaction so the transition guard sees fresh state.
pub async fn commit_contract(
    pool: &DbPool,
    project_id: &ProjectId,
    outcome: &AgentOutcome<ContractVariables>,
    trace: &TraceId,
) -> Result<Contract, PipelineError> {
    let mut tx = pool.begin().await?;

    let current = project_status_in_tx(&mut tx, project_id).await?;
    let transition = PipelineEngine.apply(&current, &PipelineEvent::ContractGenerated)?;

    let contract = Contract {
        id: ContractId(Uuid::new_v4().to_string()),
        project_id: project_id.clone(),
        variables: outcome.payload.clone(),
        signature_provider: SignatureProvider::HelloSign,
        signature_id: None,
        status: ContractStatus::Draft,
        signed_at: None,
        created_at: Utc::now(),
    };

    let variables_json = serde_json::to_string(&contract.variables)?;
    sqlx::query(
        "INSERT INTO contract (id, project_id, variables, signature_provider, signature_id,
                               status, signed_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&contract.id.0)
    .bind(&contract.project_id.0)
    .bind(variables_json)
    .bind(contract.signature_provider.as_str())
    .bind(&contract.signature_id)
    .bind(contract.status.as_str())
    .bind(None::<String>)
    .bind(contract.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE project SET status = ? WHERE id = ?")
        .bind(transition.to.as_str())
        .bind(&project_id.0)
        .execute(&mut *tx)
        .await?;

    let event = AgentEvent::new(
        trace.clone(),
        transition.audit_kind,
        "contract",
        contract.id.0.clone(),
        agent_payload(&contract, &outcome.source)?,
    );
    insert_event(&mut tx, &event).await?;

    tx.commit().await?;

    info!(
        event_name = "pipeline.contract.committed",
        trace_id = %trace.0,
        project_id = %project_id.0,
        contract_id = %contract.id.0,
        fallback = outcome.is_fallback(),
        "contract drafted and project advanced"
    );
    Ok(contract)
}

/// Persist a generated invoice, advance the project to Billing, and append
/// the `Invoice.Sent` event in one transaction.
pub async fn commit_invoice(
    pool: &DbPool,
    project_id: &ProjectId,
    amount: Decimal,
    outcome: &AgentOutcome<InvoiceDetails>,
    trace: &TraceId,
) -> Result<Invoice, PipelineError> {
    let mut tx = pool.begin().await?;

    let current = project_status_in_tx(&mut tx, project_id).await?;
    let transition = PipelineEngine.apply(&current, &PipelineEvent::InvoiceCreated)?;

    let invoice = Invoice {
        id: InvoiceId(Uuid::new_v4().to_string()),
        project_id: project_id.clone(),
        amount,
        due_date: outcome.payload.due_date,
        status: InvoiceStatus::Sent,
        stripe_intent_id: None,
        details: outcome.payload.clone(),
        created_at: Utc::now(),
    };

    let details_json = serde_json::to_string(&invoice.details)?;
    sqlx::query(
        "INSERT INTO invoice (id, project_id, amount, due_date, status, stripe_intent_id,
                              details, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&invoice.id.0)
    .bind(&invoice.project_id.0)
    .bind(invoice.amount.to_string())
    .bind(invoice.due_date.format("%Y-%m-%d").to_string())
    .bind(invoice.status.as_str())
    .bind(&invoice.stripe_intent_id)
    .bind(details_json)
    .bind(invoice.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE project SET status = ? WHERE id = ?")
        .bind(transition.to.as_str())
        .bind(&project_id.0)
        .execute(&mut *tx)
        .await?;

    let event = AgentEvent::new(
        trace.clone(),
        transition.audit_kind,
        "invoice",
        invoice.id.0.clone(),
        agent_payload(&invoice, &outcome.source)?,
    );
    insert_event(&mut tx, &event).await?;

    tx.commit().await?;

    info!(
        event_name = "pipeline.invoice.committed",
        trace_id = %trace.0,
        project_id = %project_id.0,
        invoice_id = %invoice.id.0,
        fallback = outcome.is_fallback(),
        "invoice issued and project advanced"
    );
    Ok(invoice)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;

    use freeflow_agent::AgentSource;

    use super::{agent_payload, require_user_header, PipelineError};

    #[test]
    fn user_header_is_required_and_trimmed() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            require_user_header(&headers),
            Err(PipelineError::MissingIdentity)
        ));

        headers.insert("x-user-id", " u-42 ".parse().expect("header value"));
        let user = require_user_header(&headers).expect("header accepted");
        assert_eq!(user.0, "u-42");
    }

    #[test]
    fn fallback_payloads_carry_the_reason() {
        let payload = agent_payload(
            &serde_json::json!({"id": "c-1"}),
            &AgentSource::Fallback { reason: "llm call failed".to_owned() },
        )
        .expect("payload");

        assert_eq!(payload["fallback"], serde_json::json!(true));
        assert_eq!(payload["fallback_reason"], serde_json::json!("llm call failed"));

        let model = agent_payload(&serde_json::json!({"id": "c-2"}), &AgentSource::Model)
            .expect("payload");
        assert_eq!(model["fallback"], serde_json::json!(false));
        assert!(model.get("fallback_reason").is_none());
    }
}
