//! Deterministic demo dataset: one freelancer, one client, and a project at
//! each pipeline stage with the matching downstream records and audit trail.
//! Fixed identifiers make loading idempotent, so `freeflow seed` can be run
//! repeatedly against the same database.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use freeflow_core::audit::{AgentEvent, EventKind, TraceId};
use freeflow_core::domain::client::{Client, ClientId};
use freeflow_core::domain::contract::{
    Contract, ContractId, ContractStatus, ContractVariables, SignatureProvider,
};
use freeflow_core::domain::invoice::{Invoice, InvoiceDetails, InvoiceId, InvoiceLineItem, InvoiceStatus};
use freeflow_core::domain::project::{Project, ProjectId, ProjectStatus};
use freeflow_core::domain::user::{User, UserId};

use crate::repositories::{
    ClientRepository, ContractRepository, EventRepository, InvoiceRepository, ProjectRepository,
    RepositoryError, SqlClientRepository, SqlContractRepository, SqlEventRepository,
    SqlInvoiceRepository, SqlProjectRepository, SqlUserRepository, UserRepository,
};
use crate::DbPool;

pub const SEED_USER_ID: &str = "seed-user-freelancer";
pub const SEED_CLIENT_ID: &str = "seed-client-acme";
pub const SEED_PROJECT_INTAKE_ID: &str = "seed-project-intake";
pub const SEED_PROJECT_CONTRACT_ID: &str = "seed-project-contract";
pub const SEED_PROJECT_BILLING_ID: &str = "seed-project-billing";
pub const SEED_CONTRACT_ID: &str = "seed-contract-draft";
pub const SEED_INVOICE_ID: &str = "seed-invoice-sent";

pub struct SeedDataset;

pub struct ProjectSeedInfo {
    pub stage: &'static str,
    pub project_id: &'static str,
    pub description: &'static str,
}

pub struct SeedResult {
    pub projects_seeded: Vec<ProjectSeedInfo>,
}

pub struct SeedVerification {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl SeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let now = Utc::now();

        let user = User {
            id: UserId(SEED_USER_ID.to_owned()),
            name: "Sam Rivera".to_owned(),
            email: "sam@rivera.dev".to_owned(),
            password: "demo-password".to_owned(),
            created_at: now,
        };
        SqlUserRepository::new(pool.clone()).save(user.clone()).await?;

        let client = Client {
            id: ClientId(SEED_CLIENT_ID.to_owned()),
            name: "Jane Doe".to_owned(),
            email: "jane@acme.test".to_owned(),
            company: Some("Acme Corp".to_owned()),
            phone: Some("+1-555-0100".to_owned()),
            owner_id: user.id.clone(),
            created_at: now,
        };
        SqlClientRepository::new(pool.clone()).save(client.clone()).await?;

        let project_repo = SqlProjectRepository::new(pool.clone());
        let projects = [
            (SEED_PROJECT_INTAKE_ID, "Brand refresh", ProjectStatus::Intake, Some(Decimal::new(3_500, 0))),
            (SEED_PROJECT_CONTRACT_ID, "Marketing site rebuild", ProjectStatus::Contract, Some(Decimal::new(9_000, 0))),
            (SEED_PROJECT_BILLING_ID, "Customer portal", ProjectStatus::Billing, Some(Decimal::new(20_000, 0))),
        ];
        for (id, title, status, budget) in &projects {
            project_repo
                .save(Project {
                    id: ProjectId((*id).to_owned()),
                    client_id: client.id.clone(),
                    title: (*title).to_owned(),
                    description: format!("{title} engagement for {}", client.name),
                    budget: *budget,
                    timeline: Some("6 weeks".to_owned()),
                    status: *status,
                    owner_id: user.id.clone(),
                    created_at: now,
                })
                .await?;
        }

        let variables = demo_contract_variables(&client, &user);
        SqlContractRepository::new(pool.clone())
            .save(Contract {
                id: ContractId(SEED_CONTRACT_ID.to_owned()),
                project_id: ProjectId(SEED_PROJECT_CONTRACT_ID.to_owned()),
                variables,
                signature_provider: SignatureProvider::HelloSign,
                signature_id: None,
                status: ContractStatus::Draft,
                signed_at: None,
                created_at: now,
            })
            .await?;

        SqlInvoiceRepository::new(pool.clone())
            .save(Invoice {
                id: InvoiceId(SEED_INVOICE_ID.to_owned()),
                project_id: ProjectId(SEED_PROJECT_BILLING_ID.to_owned()),
                amount: Decimal::new(20_000, 0),
                due_date: now.date_naive() + Duration::days(30),
                status: InvoiceStatus::Sent,
                stripe_intent_id: None,
                details: demo_invoice_details(now.date_naive()),
                created_at: now,
            })
            .await?;

        let event_repo = SqlEventRepository::new(pool.clone());
        let seeded_events: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM agent_event WHERE entity_id LIKE 'seed-%'")
                .fetch_one(pool)
                .await?;
        if seeded_events == 0 {
            for (kind, entity_type, entity_id) in [
                (EventKind::IntakeCompleted, "project", SEED_PROJECT_INTAKE_ID),
                (EventKind::ContractSent, "contract", SEED_CONTRACT_ID),
                (EventKind::InvoiceSent, "invoice", SEED_INVOICE_ID),
            ] {
                event_repo
                    .append(AgentEvent::new(
                        TraceId::generate(),
                        kind,
                        entity_type,
                        entity_id,
                        json!({"seeded": true}),
                    ))
                    .await?;
            }
        }

        Ok(SeedResult {
            projects_seeded: vec![
                ProjectSeedInfo {
                    stage: "Intake",
                    project_id: SEED_PROJECT_INTAKE_ID,
                    description: "fresh inquiry, no contract yet",
                },
                ProjectSeedInfo {
                    stage: "Contract",
                    project_id: SEED_PROJECT_CONTRACT_ID,
                    description: "draft contract generated",
                },
                ProjectSeedInfo {
                    stage: "Billing",
                    project_id: SEED_PROJECT_BILLING_ID,
                    description: "invoice sent, awaiting payment",
                },
            ],
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<SeedVerification, RepositoryError> {
        let mut checks = Vec::new();

        for (label, query) in [
            ("seed-user", "SELECT COUNT(*) FROM user WHERE id = 'seed-user-freelancer'"),
            ("seed-client", "SELECT COUNT(*) FROM client WHERE id = 'seed-client-acme'"),
            ("seed-projects", "SELECT COUNT(*) FROM project WHERE id LIKE 'seed-project-%'"),
            ("seed-contract", "SELECT COUNT(*) FROM contract WHERE id = 'seed-contract-draft'"),
            ("seed-invoice", "SELECT COUNT(*) FROM invoice WHERE id = 'seed-invoice-sent'"),
            ("seed-events", "SELECT COUNT(*) FROM agent_event WHERE entity_id LIKE 'seed-%'"),
        ] {
            let count: i64 = sqlx::query_scalar(query).fetch_one(pool).await?;
            let expected = match label {
                "seed-projects" | "seed-events" => 3,
                _ => 1,
            };
            checks.push((label, count == expected));
        }

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(SeedVerification { all_present, checks })
    }
}

fn demo_contract_variables(client: &Client, user: &User) -> ContractVariables {
    let today = Utc::now().date_naive();
    ContractVariables {
        client_name: client.name.clone(),
        client_company: client.company.clone().unwrap_or_else(|| "Individual".to_owned()),
        client_email: client.email.clone(),
        freelancer_name: user.name.clone(),
        freelancer_business: "Sam Digital Services".to_owned(),
        freelancer_email: user.email.clone(),
        project_description: "Marketing site rebuild engagement".to_owned(),
        deliverables_list: vec![
            "Project planning and requirements analysis".to_owned(),
            "Development and implementation".to_owned(),
            "Final delivery and documentation".to_owned(),
        ],
        start_date: today,
        end_date: today + Duration::days(42),
        milestone_1: "Design approved - Week 1".to_owned(),
        milestone_2: "Build complete - Week 4".to_owned(),
        milestone_3: "Launch - Week 6".to_owned(),
        project_budget: Decimal::new(9_000, 0),
        payment_terms: "50% upfront, 50% on completion".to_owned(),
        invoice_platform: "email".to_owned(),
        net_terms: "30".to_owned(),
        late_fee: "1.5".to_owned(),
        jurisdiction: "State of California".to_owned(),
    }
}

fn demo_invoice_details(issue_date: chrono::NaiveDate) -> InvoiceDetails {
    InvoiceDetails {
        invoice_number: "INV-2026-0001".to_owned(),
        issue_date,
        due_date: issue_date + Duration::days(30),
        line_items: vec![
            InvoiceLineItem {
                description: "Portal development".to_owned(),
                amount: Decimal::new(12_000, 0),
            },
            InvoiceLineItem {
                description: "Integration work".to_owned(),
                amount: Decimal::new(6_000, 0),
            },
            InvoiceLineItem {
                description: "Launch support".to_owned(),
                amount: Decimal::new(2_000, 0),
            },
        ],
        subtotal: Decimal::new(20_000, 0),
        tax_rate: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        total_due: Decimal::new(20_000, 0),
        payment_platform: "Stripe".to_owned(),
        payment_link: "https://pay.stripe.com/invoice_link".to_owned(),
        payment_instructions: "Please process payment according to agreed terms.".to_owned(),
        net_terms: "30".to_owned(),
        late_fee: "1.5".to_owned(),
    }
}
