use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use freeflow_core::{Client, ContractVariables, Project, User};

use crate::llm::LlmClient;
use crate::sanitize::strip_code_fence;
use crate::AgentOutcome;

const SYSTEM_PROMPT: &str = r#"You are an AI contract agent. Generate professional freelance contract variables.

Return JSON with these exact contract variables:
{
    "client_name": "client full name",
    "client_company": "company name or 'Individual' if none",
    "client_email": "client email address",
    "freelancer_name": "the freelancer's full name",
    "freelancer_business": "the freelancer's business name",
    "freelancer_email": "the freelancer's email address",
    "project_description": "detailed description of work to be performed",
    "deliverables_list": ["between 3 and 6 specific deliverables"],
    "start_date": "YYYY-MM-DD format",
    "end_date": "YYYY-MM-DD format",
    "milestone_1": "First milestone with deadline",
    "milestone_2": "Second milestone with deadline",
    "milestone_3": "Third milestone with deadline",
    "project_budget": 0,
    "payment_terms": "chosen payment structure",
    "invoice_platform": "email",
    "net_terms": "30",
    "late_fee": "1.5",
    "jurisdiction": "State of California"
}

Sizing rules:
- Derive the start_date/end_date span from project complexity and budget: under $5,000 plan 2-4 weeks, $5,000-$15,000 plan 4-8 weeks, over $15,000 plan 8-12 weeks.
- Place milestone_1 around 20-30% of the timeline, milestone_2 around 50-60%, and milestone_3 around 90-100%.
- Choose payment_terms by project size and risk from exactly this menu: "50% upfront, 50% on completion", "33% upfront, 33% midway, 34% on completion", "100% on completion", "25% upfront, 75% on completion".
- Always keep invoice_platform "email", net_terms "30", late_fee "1.5", and jurisdiction "State of California"."#;

/// Produce the variables for a freelance service agreement. One LLM call,
/// no retries; parse or validation failure is absorbed by a fallback
/// synthesized from the input records.
pub async fn generate_variables(
    llm: &dyn LlmClient,
    project: &Project,
    client: &Client,
    freelancer: &User,
) -> AgentOutcome<ContractVariables> {
    match draft(llm, project, client, freelancer).await {
        Ok(variables) => AgentOutcome::model(variables),
        Err(reason) => {
            warn!(
                event_name = "agent.contract.fallback",
                project_id = %project.id.0,
                reason = %reason,
                "contract agent fell back"
            );
            AgentOutcome::fallback(fallback(project, client, freelancer), reason)
        }
    }
}

async fn draft(
    llm: &dyn LlmClient,
    project: &Project,
    client: &Client,
    freelancer: &User,
) -> Result<ContractVariables, String> {
    let user_prompt = format!(
        "Generate contract variables for this freelance project:\n\n\
         Client Information:\n\
         - Name: {}\n\
         - Email: {}\n\
         - Company: {}\n\n\
         Project Information:\n\
         - Title: {}\n\
         - Description: {}\n\
         - Budget: ${}\n\
         - Timeline: {}\n\n\
         Freelancer Information:\n\
         - Name: {}\n\
         - Email: {}\n\n\
         Use the actual freelancer name and create a business name if not provided.",
        client.name,
        client.email,
        client.company.as_deref().unwrap_or("Individual"),
        project.title,
        project.description,
        project.budget.unwrap_or(Decimal::ZERO),
        project.timeline.as_deref().unwrap_or("Not specified"),
        freelancer.name,
        freelancer.email,
    );

    let completion = llm
        .complete(SYSTEM_PROMPT, &user_prompt)
        .await
        .map_err(|error| format!("llm call failed: {error}"))?;

    let cleaned = strip_code_fence(&completion);
    let variables: ContractVariables = serde_json::from_str(cleaned)
        .map_err(|error| format!("response was not valid contract JSON: {error}"))?;
    variables.validate().map_err(|error| error.to_string())?;

    Ok(variables)
}

/// Deterministic contract variables built from the input records: generic
/// deliverables and week-based milestones, a thirty-day engagement starting
/// today, and the standard administrative defaults.
pub fn fallback(project: &Project, client: &Client, freelancer: &User) -> ContractVariables {
    let today = Utc::now().date_naive();
    let first_name = freelancer.name.split_whitespace().next().unwrap_or("Freelancer");

    ContractVariables {
        client_name: client.name.clone(),
        client_company: client.company.clone().unwrap_or_else(|| "Individual".to_owned()),
        client_email: client.email.clone(),
        freelancer_name: freelancer.name.clone(),
        freelancer_business: format!("{first_name} Digital Services"),
        freelancer_email: freelancer.email.clone(),
        project_description: if project.description.trim().is_empty() {
            "Professional services as described".to_owned()
        } else {
            project.description.clone()
        },
        deliverables_list: vec![
            "Project planning and requirements analysis".to_owned(),
            "Development and implementation".to_owned(),
            "Testing and quality assurance".to_owned(),
            "Final delivery and documentation".to_owned(),
        ],
        start_date: today,
        end_date: today + Duration::days(30),
        milestone_1: "Project kickoff and requirements - Week 1".to_owned(),
        milestone_2: "Development phase completion - Week 3".to_owned(),
        milestone_3: "Final delivery and testing - Week 4".to_owned(),
        project_budget: project.budget.unwrap_or(Decimal::ZERO),
        payment_terms: "50% upfront, 50% on completion".to_owned(),
        invoice_platform: "email".to_owned(),
        net_terms: "30".to_owned(),
        late_fee: "1.5".to_owned(),
        jurisdiction: "State of California".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use freeflow_core::{Client, ClientId, Project, ProjectId, ProjectStatus, User, UserId};

    use crate::llm::{FailingLlmClient, StaticLlmClient};

    use super::generate_variables;

    fn freelancer() -> User {
        User {
            id: UserId("u-1".to_owned()),
            name: "Sam Rivera".to_owned(),
            email: "sam@rivera.dev".to_owned(),
            password: "hunter2".to_owned(),
            created_at: Utc::now(),
        }
    }

    fn client() -> Client {
        Client {
            id: ClientId("c-1".to_owned()),
            name: "Jane Doe".to_owned(),
            email: "jane@x.com".to_owned(),
            company: None,
            phone: None,
            owner_id: UserId("u-1".to_owned()),
            created_at: Utc::now(),
        }
    }

    fn project(budget: Option<Decimal>, timeline: Option<&str>) -> Project {
        Project {
            id: ProjectId("p-1".to_owned()),
            client_id: ClientId("c-1".to_owned()),
            title: "Platform rebuild".to_owned(),
            description: "Rebuild the customer platform".to_owned(),
            budget,
            timeline: timeline.map(str::to_owned),
            status: ProjectStatus::Intake,
            owner_id: UserId("u-1".to_owned()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn outage_fallback_covers_every_required_field() {
        let project = project(Some(Decimal::new(20_000, 0)), None);
        let outcome =
            generate_variables(&FailingLlmClient, &project, &client(), &freelancer()).await;

        assert!(outcome.is_fallback());
        let vars = &outcome.payload;
        assert_eq!(vars.client_name, "Jane Doe");
        assert_eq!(vars.client_company, "Individual");
        assert_eq!(vars.freelancer_business, "Sam Digital Services");
        assert_eq!(vars.end_date, vars.start_date + Duration::days(30));
        assert_eq!(vars.deliverables_list.len(), 4);
        assert!(!vars.milestone_1.is_empty());
        assert!(!vars.milestone_2.is_empty());
        assert!(!vars.milestone_3.is_empty());
        assert_eq!(vars.project_budget, Decimal::new(20_000, 0));
        assert_eq!(vars.jurisdiction, "State of California");
        vars.validate().expect("fallback variables must validate");
    }

    #[tokio::test]
    async fn missing_budget_falls_back_to_zero() {
        let project = project(None, Some("6 weeks"));
        let outcome =
            generate_variables(&FailingLlmClient, &project, &client(), &freelancer()).await;
        assert_eq!(outcome.payload.project_budget, Decimal::ZERO);
    }

    #[tokio::test]
    async fn model_response_with_inverted_dates_falls_back() {
        let llm = StaticLlmClient::new(
            r#"{
    "client_name": "Jane Doe", "client_company": "Individual", "client_email": "jane@x.com",
    "freelancer_name": "Sam Rivera", "freelancer_business": "Rivera Studio", "freelancer_email": "sam@rivera.dev",
    "project_description": "Rebuild", "deliverables_list": ["Plan", "Build", "Ship"],
    "start_date": "2026-04-01", "end_date": "2026-03-01",
    "milestone_1": "Kickoff", "milestone_2": "Midpoint", "milestone_3": "Launch",
    "project_budget": 20000, "payment_terms": "50% upfront, 50% on completion",
    "invoice_platform": "email", "net_terms": "30", "late_fee": "1.5", "jurisdiction": "State of California"
}"#,
        );

        let outcome = generate_variables(&llm, &project(None, None), &client(), &freelancer()).await;
        assert!(outcome.is_fallback());
    }

    #[tokio::test]
    async fn well_formed_model_response_is_used_as_is() {
        let llm = StaticLlmClient::new(
            r#"```json
{
    "client_name": "Jane Doe", "client_company": "Doe LLC", "client_email": "jane@x.com",
    "freelancer_name": "Sam Rivera", "freelancer_business": "Rivera Studio", "freelancer_email": "sam@rivera.dev",
    "project_description": "Full rebuild of the customer platform",
    "deliverables_list": ["Discovery report", "New frontend", "Deployment runbook"],
    "start_date": "2026-03-01", "end_date": "2026-05-01",
    "milestone_1": "Discovery complete - 2026-03-14", "milestone_2": "Beta live - 2026-04-05", "milestone_3": "Launch - 2026-04-28",
    "project_budget": 20000, "payment_terms": "33% upfront, 33% midway, 34% on completion",
    "invoice_platform": "email", "net_terms": "30", "late_fee": "1.5", "jurisdiction": "State of California"
}
```"#,
        );

        let outcome = generate_variables(&llm, &project(None, None), &client(), &freelancer()).await;

        assert!(!outcome.is_fallback());
        assert_eq!(outcome.payload.freelancer_business, "Rivera Studio");
        assert_eq!(outcome.payload.deliverables_list.len(), 3);
    }
}
