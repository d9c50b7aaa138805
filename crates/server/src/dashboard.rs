//! Dashboard surface: pipeline counts, the work queue, and the agent
//! activity feed read back from the audit trail.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;

use freeflow_core::audit::AgentEvent;
use freeflow_db::repositories::{EventRepository, SqlEventRepository};

use crate::pipeline::PipelineError;
use crate::AppState;

const DEFAULT_ACTIVITY_LIMIT: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/work-queue", get(work_queue))
        .route("/dashboard/agent-activity", get(agent_activity))
}

#[derive(Debug, Serialize)]
struct ProjectStats {
    intake: i64,
    contract: i64,
    billing: i64,
}

#[derive(Debug, Serialize)]
struct ContractStats {
    pending: i64,
    signed: i64,
}

#[derive(Debug, Serialize)]
struct InvoiceStats {
    sent: i64,
    paid: i64,
    overdue: i64,
}

#[derive(Debug, Serialize)]
struct DashboardStats {
    projects: ProjectStats,
    contracts: ContractStats,
    invoices: InvoiceStats,
}

async fn count_by_status(
    state: &AppState,
    table: &str,
    status: &str,
) -> Result<i64, PipelineError> {
    // Table names come from the fixed call sites below, never from input.
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE status = ?"))
        .bind(status)
        .fetch_one(&state.db_pool)
        .await?;
    Ok(count)
}

async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, PipelineError> {
    let stats = DashboardStats {
        projects: ProjectStats {
            intake: count_by_status(&state, "project", "Intake").await?,
            contract: count_by_status(&state, "project", "Contract").await?,
            billing: count_by_status(&state, "project", "Billing").await?,
        },
        contracts: ContractStats {
            pending: count_by_status(&state, "contract", "AwaitingSignature").await?,
            signed: count_by_status(&state, "contract", "Signed").await?,
        },
        invoices: InvoiceStats {
            sent: count_by_status(&state, "invoice", "Sent").await?,
            paid: count_by_status(&state, "invoice", "Paid").await?,
            overdue: count_by_status(&state, "invoice", "Overdue").await?,
        },
    };

    Ok(Json(stats))
}

#[derive(Debug, Serialize)]
struct WorkItem {
    id: String,
    #[serde(rename = "type")]
    item_type: &'static str,
    priority: &'static str,
    title: String,
    description: String,
    link: String,
}

/// Items that need operator attention: projects without a budget and sent
/// invoices past their due date.
async fn work_queue(State(state): State<AppState>) -> Result<Json<Vec<WorkItem>>, PipelineError> {
    let mut work_items = Vec::new();

    let missing_budget = sqlx::query(
        "SELECT id, title FROM project WHERE budget IS NULL ORDER BY created_at DESC LIMIT 100",
    )
    .fetch_all(&state.db_pool)
    .await?;
    for row in &missing_budget {
        let id: String = row.try_get("id")?;
        let title: String = row.try_get("title")?;
        work_items.push(WorkItem {
            link: format!("/projects/{id}"),
            id,
            item_type: "project",
            priority: "medium",
            title: format!("Missing budget for {title}"),
            description: "Project needs budget information".to_owned(),
        });
    }

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let overdue = sqlx::query(
        "SELECT id, amount, due_date FROM invoice
         WHERE status = 'Sent' AND due_date < ?
         ORDER BY due_date ASC LIMIT 100",
    )
    .bind(&today)
    .fetch_all(&state.db_pool)
    .await?;
    for row in &overdue {
        let id: String = row.try_get("id")?;
        let amount: String = row.try_get("amount")?;
        let due_date: String = row.try_get("due_date")?;
        work_items.push(WorkItem {
            link: format!("/invoices/{id}"),
            id,
            item_type: "invoice",
            priority: "high",
            title: format!("Invoice ${amount} overdue"),
            description: format!("Due {due_date}"),
        });
    }

    Ok(Json(work_items))
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    limit: Option<u32>,
}

async fn agent_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<AgentEvent>>, PipelineError> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let events = SqlEventRepository::new(state.db_pool.clone()).list_recent(limit).await?;
    Ok(Json(events))
}
