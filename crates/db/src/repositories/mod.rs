use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use freeflow_core::audit::AgentEvent;
use freeflow_core::domain::client::{Client, ClientId};
use freeflow_core::domain::contract::{Contract, ContractId};
use freeflow_core::domain::invoice::{Invoice, InvoiceId};
use freeflow_core::domain::project::{Project, ProjectId};
use freeflow_core::domain::user::{User, UserId};

pub mod client;
pub mod contract;
pub mod event;
pub mod invoice;
pub mod memory;
pub mod project;
pub mod user;

pub use client::SqlClientRepository;
pub use contract::SqlContractRepository;
pub use event::SqlEventRepository;
pub use invoice::SqlInvoiceRepository;
pub use memory::{InMemoryClientRepository, InMemoryEventRepository, InMemoryProjectRepository};
pub use project::SqlProjectRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: User) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Client>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Client>, RepositoryError>;
    async fn save(&self, client: Client) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Project>, RepositoryError>;
    async fn save(&self, project: Project) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ContractRepository: Send + Sync {
    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError>;
    async fn list_for_project(&self, project_id: &ProjectId)
        -> Result<Vec<Contract>, RepositoryError>;
    async fn save(&self, contract: Contract) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, RepositoryError>;
    async fn list_for_project(&self, project_id: &ProjectId)
        -> Result<Vec<Invoice>, RepositoryError>;
    async fn save(&self, invoice: Invoice) -> Result<(), RepositoryError>;
}

/// Audit trail access. Append-only by construction: there is no update or
/// delete surface here.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn append(&self, event: AgentEvent) -> Result<(), RepositoryError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<AgentEvent>, RepositoryError>;
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| RepositoryError::Decode(format!("column `{column}` holds invalid date `{raw}`")))
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>().map_err(|_| {
        RepositoryError::Decode(format!("column `{column}` holds invalid decimal `{raw}`"))
    })
}
