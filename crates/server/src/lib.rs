//! HTTP surface for the FreeFlow pipeline.
//!
//! Route modules are grouped by surface: `accounts` (auth, clients,
//! projects), `intake`, `contracts`, `invoices`, `dashboard`, and
//! `webhooks`, all mounted under `/api`. The `pipeline` module owns the
//! transactional step helpers every state-changing endpoint goes through;
//! `pdf` renders contract and invoice documents; `health` runs on its own
//! port.

pub mod accounts;
pub mod bootstrap;
pub mod contracts;
pub mod dashboard;
pub mod health;
pub mod intake;
pub mod invoices;
pub mod pdf;
pub mod pipeline;
pub mod webhooks;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use freeflow_agent::llm::LlmClient;
use freeflow_db::DbPool;

use crate::pdf::PdfGenerator;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub llm: Arc<dyn LlmClient>,
    pub pdf: Arc<PdfGenerator>,
}

impl AppState {
    pub fn new(db_pool: DbPool, llm: Arc<dyn LlmClient>, pdf: Arc<PdfGenerator>) -> Self {
        Self { db_pool, llm, pdf }
    }
}

/// Assemble the full `/api` surface. CORS stays permissive; the browser
/// frontend is served from a different origin in development.
pub fn api_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(root))
        .merge(accounts::router())
        .merge(intake::router())
        .merge(contracts::router())
        .merge(invoices::router())
        .merge(dashboard::router())
        .merge(webhooks::router())
        .with_state(state);

    Router::new().nest("/api", api).layer(CorsLayer::permissive())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "FreeFlow API is running", "status": "healthy"}))
}
