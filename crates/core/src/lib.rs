//! Domain core for the FreeFlow back-office pipeline.
//!
//! Everything here is pure data and deterministic logic: the entity model
//! (users, clients, projects, contracts, invoices), the append-only agent
//! event log, the pipeline transition engine, and configuration loading.
//! No I/O happens in this crate; persistence lives in `freeflow-db` and the
//! LLM integration in `freeflow-agent`.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use audit::{AgentEvent, AuditSink, EventKind, InMemoryAuditSink, TraceId};
pub use domain::client::{Client, ClientId};
pub use domain::contract::{
    Contract, ContractId, ContractStatus, ContractVariables, SignatureProvider,
};
pub use domain::invoice::{Invoice, InvoiceDetails, InvoiceId, InvoiceLineItem, InvoiceStatus};
pub use domain::project::{Project, ProjectId, ProjectStatus};
pub use domain::user::{User, UserId};
pub use errors::DomainError;
pub use flows::{PipelineEngine, PipelineEvent, PipelineTransitionError, TransitionOutcome};
