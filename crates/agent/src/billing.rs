use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use freeflow_core::{InvoiceDetails, InvoiceLineItem, Project};

use crate::llm::LlmClient;
use crate::sanitize::strip_code_fence;
use crate::AgentOutcome;

const SYSTEM_PROMPT: &str = r#"You are an AI billing agent. Create professional invoices.

Return JSON with invoice data including ALL required fields:
{
    "invoice_number": "INV-2026-0001 or INV- followed by 8 uppercase alphanumerics",
    "issue_date": "YYYY-MM-DD",
    "due_date": "YYYY-MM-DD",
    "line_items": [
        {"description": "Service 1", "amount": 0},
        {"description": "Service 2", "amount": 0}
    ],
    "subtotal": 0,
    "tax_rate": 0.00,
    "tax_amount": 0.00,
    "total_due": 0,
    "payment_platform": "Stripe",
    "payment_link": "https://pay.stripe.com/invoice_link",
    "payment_instructions": "Please process payment according to agreed terms.",
    "net_terms": "30",
    "late_fee": "1.5"
}

Rules:
- issue_date is today and due_date is 30 days from today.
- Break the project amount into 3 to 6 logical line items whose amounts sum EXACTLY to the given total. Do not approximate.
- tax_rate defaults to 0, tax_amount = subtotal * tax_rate, total_due = subtotal + tax_amount.
- IMPORTANT: Always include invoice_number, issue_date, and due_date fields."#;

/// How the invoice amount was arrived at. Carried through to the agent
/// prompt so line items match the engagement style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingMode {
    Fixed,
    Hourly,
    Milestone,
}

impl BillingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Hourly => "hourly",
            Self::Milestone => "milestone",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "hourly" => Some(Self::Hourly),
            "milestone" => Some(Self::Milestone),
            _ => None,
        }
    }
}

/// Raw parse target for the model response. The three header fields are
/// never trusted to be present; everything else is required and a miss
/// routes to the fallback.
#[derive(Debug, Deserialize)]
struct RawInvoiceDetails {
    invoice_number: Option<String>,
    issue_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    line_items: Vec<InvoiceLineItem>,
    #[serde(default)]
    tax_rate: Decimal,
    #[serde(default)]
    tax_amount: Decimal,
    payment_platform: String,
    payment_link: String,
    payment_instructions: String,
    net_terms: String,
    late_fee: String,
}

/// Produce an itemized invoice payload for a project. Whatever the model
/// returns, the caller-supplied amount wins: subtotal and total_due are
/// overwritten with it, and line items that fail to reconcile against it
/// force the fallback split.
pub async fn generate_invoice_details(
    llm: &dyn LlmClient,
    project: &Project,
    amount: Decimal,
    mode: BillingMode,
) -> AgentOutcome<InvoiceDetails> {
    match itemize(llm, project, amount, mode).await {
        Ok(details) => AgentOutcome::model(details),
        Err(reason) => {
            warn!(
                event_name = "agent.billing.fallback",
                project_id = %project.id.0,
                reason = %reason,
                "billing agent fell back"
            );
            AgentOutcome::fallback(fallback(amount), reason)
        }
    }
}

async fn itemize(
    llm: &dyn LlmClient,
    project: &Project,
    amount: Decimal,
    mode: BillingMode,
) -> Result<InvoiceDetails, String> {
    let user_prompt = format!(
        "Generate invoice data for:\n\
         Project: {} - {}\n\
         Amount: ${amount}\n\
         Mode: {}\n\n\
         Create appropriate line items based on the project description and amount.\n\
         Include invoice number, issue date (today), and due date (30 days from today).\n\
         MUST include all required fields: invoice_number, issue_date, due_date.",
        project.title,
        project.description,
        mode.as_str(),
    );

    let completion = llm
        .complete(SYSTEM_PROMPT, &user_prompt)
        .await
        .map_err(|error| format!("llm call failed: {error}"))?;

    let cleaned = strip_code_fence(&completion);
    let raw: RawInvoiceDetails = serde_json::from_str(cleaned)
        .map_err(|error| format!("response was not valid invoice JSON: {error}"))?;

    let details = normalize(raw, amount);
    details.validate().map_err(|error| error.to_string())?;

    Ok(details)
}

/// Backfill the untrusted header fields and pin the money columns to the
/// caller amount. Runs on the success path for every model response.
fn normalize(raw: RawInvoiceDetails, amount: Decimal) -> InvoiceDetails {
    let today = Utc::now().date_naive();

    InvoiceDetails {
        invoice_number: raw.invoice_number.unwrap_or_else(generate_invoice_number),
        issue_date: raw.issue_date.unwrap_or(today),
        due_date: raw.due_date.unwrap_or(today + Duration::days(30)),
        line_items: raw.line_items,
        subtotal: amount,
        tax_rate: raw.tax_rate,
        tax_amount: raw.tax_amount,
        total_due: amount,
        payment_platform: raw.payment_platform,
        payment_link: raw.payment_link,
        payment_instructions: raw.payment_instructions,
        net_terms: raw.net_terms,
        late_fee: raw.late_fee,
    }
}

fn generate_invoice_number() -> String {
    let id = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("INV-{}", &id[..8])
}

/// Deterministic invoice: fresh number, today/+30 dates, and a 60/30/10
/// split across three generic line items. The final item absorbs rounding so
/// the split always sums to the exact amount.
pub fn fallback(amount: Decimal) -> InvoiceDetails {
    let today = Utc::now().date_naive();
    let development = (amount * Decimal::new(6, 1)).round_dp(2);
    let assurance = (amount * Decimal::new(3, 1)).round_dp(2);
    let delivery = amount - development - assurance;

    InvoiceDetails {
        invoice_number: generate_invoice_number(),
        issue_date: today,
        due_date: today + Duration::days(30),
        line_items: vec![
            InvoiceLineItem {
                description: "Project development and implementation".to_owned(),
                amount: development,
            },
            InvoiceLineItem {
                description: "Testing and quality assurance".to_owned(),
                amount: assurance,
            },
            InvoiceLineItem {
                description: "Final delivery and support".to_owned(),
                amount: delivery,
            },
        ],
        subtotal: amount,
        tax_rate: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        total_due: amount,
        payment_platform: "Stripe".to_owned(),
        payment_link: "https://pay.stripe.com/invoice_link".to_owned(),
        payment_instructions: "Please process payment according to agreed terms.".to_owned(),
        net_terms: "30".to_owned(),
        late_fee: "1.5".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use freeflow_core::{ClientId, Project, ProjectId, ProjectStatus, UserId};

    use crate::llm::{FailingLlmClient, StaticLlmClient};

    use super::{generate_invoice_details, BillingMode};

    fn project() -> Project {
        Project {
            id: ProjectId("p-1".to_owned()),
            client_id: ClientId("c-1".to_owned()),
            title: "Platform rebuild".to_owned(),
            description: "Rebuild the customer platform".to_owned(),
            budget: Some(Decimal::new(9_000, 0)),
            timeline: Some("6 weeks".to_owned()),
            status: ProjectStatus::Contract,
            owner_id: UserId("u-1".to_owned()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn outage_fallback_splits_sixty_thirty_ten() {
        let amount = Decimal::new(9_000, 0);
        let outcome =
            generate_invoice_details(&FailingLlmClient, &project(), amount, BillingMode::Fixed)
                .await;

        assert!(outcome.is_fallback());
        let details = &outcome.payload;
        assert_eq!(details.line_items.len(), 3);
        assert_eq!(details.line_items[0].amount, Decimal::new(540_000, 2));
        assert_eq!(details.line_items[1].amount, Decimal::new(270_000, 2));
        assert_eq!(details.line_items[2].amount, Decimal::new(90_000, 2));
        assert_eq!(details.line_item_total(), amount);
        assert_eq!(details.subtotal, amount);
        assert_eq!(details.total_due, amount);
        assert!(details.invoice_number.starts_with("INV-"));
        assert_eq!(details.due_date, details.issue_date + chrono::Duration::days(30));
    }

    #[tokio::test]
    async fn fallback_split_is_exact_for_awkward_amounts() {
        let amount = Decimal::new(10_001, 2); // $100.01
        let outcome =
            generate_invoice_details(&FailingLlmClient, &project(), amount, BillingMode::Hourly)
                .await;

        assert_eq!(outcome.payload.line_item_total(), amount);
        outcome.payload.validate().expect("fallback invoice must validate");
    }

    #[tokio::test]
    async fn model_totals_are_overwritten_with_caller_amount() {
        let llm = StaticLlmClient::new(
            r#"```json
{
    "invoice_number": "INV-2026-0042",
    "issue_date": "2026-03-01",
    "due_date": "2026-03-31",
    "line_items": [
        {"description": "Discovery", "amount": 3000},
        {"description": "Build", "amount": 5000},
        {"description": "Launch", "amount": 1000}
    ],
    "subtotal": 8999,
    "tax_rate": 0.00,
    "tax_amount": 0.00,
    "total_due": 8999,
    "payment_platform": "Stripe",
    "payment_link": "https://pay.stripe.com/invoice_link",
    "payment_instructions": "Please process payment according to agreed terms.",
    "net_terms": "30",
    "late_fee": "1.5"
}
```"#,
        );

        let amount = Decimal::new(9_000, 0);
        let outcome =
            generate_invoice_details(&llm, &project(), amount, BillingMode::Fixed).await;

        assert!(!outcome.is_fallback());
        assert_eq!(outcome.payload.subtotal, amount);
        assert_eq!(outcome.payload.total_due, amount);
        assert_eq!(outcome.payload.invoice_number, "INV-2026-0042");
    }

    #[tokio::test]
    async fn missing_header_fields_are_backfilled() {
        let llm = StaticLlmClient::new(
            r#"{
    "line_items": [
        {"description": "Development", "amount": 5400},
        {"description": "QA", "amount": 2700},
        {"description": "Delivery", "amount": 900}
    ],
    "subtotal": 9000,
    "total_due": 9000,
    "payment_platform": "Stripe",
    "payment_link": "https://pay.stripe.com/invoice_link",
    "payment_instructions": "Please process payment according to agreed terms.",
    "net_terms": "30",
    "late_fee": "1.5"
}"#,
        );

        let outcome =
            generate_invoice_details(&llm, &project(), Decimal::new(9_000, 0), BillingMode::Fixed)
                .await;

        assert!(!outcome.is_fallback());
        assert!(outcome.payload.invoice_number.starts_with("INV-"));
        assert_eq!(
            outcome.payload.due_date,
            outcome.payload.issue_date + chrono::Duration::days(30)
        );
    }

    #[tokio::test]
    async fn unreconciled_line_items_force_the_fallback() {
        let llm = StaticLlmClient::new(
            r#"{
    "invoice_number": "INV-2026-0099",
    "issue_date": "2026-03-01",
    "due_date": "2026-03-31",
    "line_items": [
        {"description": "Everything", "amount": 1234}
    ],
    "subtotal": 9000,
    "total_due": 9000,
    "payment_platform": "Stripe",
    "payment_link": "https://pay.stripe.com/invoice_link",
    "payment_instructions": "Please process payment according to agreed terms.",
    "net_terms": "30",
    "late_fee": "1.5"
}"#,
        );

        let amount = Decimal::new(9_000, 0);
        let outcome =
            generate_invoice_details(&llm, &project(), amount, BillingMode::Milestone).await;

        assert!(outcome.is_fallback());
        assert_eq!(outcome.payload.line_item_total(), amount);
    }

    #[test]
    fn billing_mode_parses_case_insensitively() {
        assert_eq!(BillingMode::parse("Fixed"), Some(BillingMode::Fixed));
        assert_eq!(BillingMode::parse(" hourly "), Some(BillingMode::Hourly));
        assert_eq!(BillingMode::parse("milestone"), Some(BillingMode::Milestone));
        assert_eq!(BillingMode::parse("retainer"), None);
    }
}
