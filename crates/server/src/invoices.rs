//! Invoice surface: creation, lookup, PDF download, and reminders.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freeflow_agent::billing::{self, BillingMode};
use freeflow_core::audit::TraceId;
use freeflow_core::domain::invoice::{Invoice, InvoiceId};
use freeflow_core::domain::project::ProjectId;
use freeflow_db::repositories::{
    InvoiceRepository, ProjectRepository, SqlInvoiceRepository, SqlProjectRepository,
};

use crate::pdf::attachment_filename;
use crate::pipeline::{self, PipelineError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invoices/create", post(create))
        .route("/invoices/{id}", get(get_invoice))
        .route("/invoices/{id}/pdf", get(download_pdf))
        .route("/invoices/remind/{id}", post(remind))
}

#[derive(Debug, Deserialize)]
struct InvoiceCreateRequest {
    project_id: String,
    amount: Decimal,
    mode: String,
    // Caller-provided line items are accepted for API compatibility but the
    // billing agent remains the source of the itemization.
    #[serde(default)]
    #[allow(dead_code)]
    line_items: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct InvoiceResponse {
    #[serde(flatten)]
    invoice: Invoice,
    is_fallback: bool,
    trace_id: String,
}

/// Create an invoice for a project. The billing agent itemizes the amount;
/// whatever it returns, the caller amount is authoritative for the totals.
async fn create(
    State(state): State<AppState>,
    Json(request): Json<InvoiceCreateRequest>,
) -> Result<Json<InvoiceResponse>, PipelineError> {
    let trace = TraceId::generate();
    let project_id = ProjectId(request.project_id);

    if request.amount <= Decimal::ZERO {
        return Err(PipelineError::BadRequest("amount must be positive".to_owned()));
    }
    let mode = BillingMode::parse(&request.mode).ok_or_else(|| {
        PipelineError::BadRequest(format!(
            "unknown billing mode `{}` (expected fixed|hourly|milestone)",
            request.mode
        ))
    })?;

    let project = SqlProjectRepository::new(state.db_pool.clone())
        .find_by_id(&project_id)
        .await?
        .ok_or(PipelineError::NotFound { entity: "project" })?;

    let outcome =
        billing::generate_invoice_details(state.llm.as_ref(), &project, request.amount, mode)
            .await;
    let invoice =
        pipeline::commit_invoice(&state.db_pool, &project_id, request.amount, &outcome, &trace)
            .await?;

    Ok(Json(InvoiceResponse {
        invoice,
        is_fallback: outcome.is_fallback(),
        trace_id: trace.0,
    }))
}

async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, PipelineError> {
    SqlInvoiceRepository::new(state.db_pool.clone())
        .find_by_id(&InvoiceId(id))
        .await?
        .map(Json)
        .ok_or(PipelineError::NotFound { entity: "invoice" })
}

async fn download_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, PipelineError> {
    let invoice = SqlInvoiceRepository::new(state.db_pool.clone())
        .find_by_id(&InvoiceId(id))
        .await?
        .ok_or(PipelineError::NotFound { entity: "invoice" })?;

    let rendered = state
        .pdf
        .render_invoice(&invoice)
        .await
        .map_err(|error| PipelineError::State(error.to_string()))?;

    Ok(rendered.into_response(&attachment_filename(&invoice.id.0)))
}

#[derive(Debug, Serialize)]
struct RemindResponse {
    message: &'static str,
    invoice_id: String,
}

/// Send a payment reminder (mock: acknowledgment only).
async fn remind(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RemindResponse>, PipelineError> {
    SqlInvoiceRepository::new(state.db_pool.clone())
        .find_by_id(&InvoiceId(id.clone()))
        .await?
        .ok_or(PipelineError::NotFound { entity: "invoice" })?;

    Ok(Json(RemindResponse { message: "Reminder sent", invoice_id: id }))
}
