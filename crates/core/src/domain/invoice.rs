use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::project::ProjectId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Failed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::Paid => "Paid",
            Self::Overdue => "Overdue",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Draft" => Some(Self::Draft),
            "Sent" => Some(Self::Sent),
            "Paid" => Some(Self::Paid),
            "Overdue" => Some(Self::Overdue),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    pub amount: Decimal,
}

/// Itemized invoice payload produced by the billing agent (or its fallback).
/// The billing step overwrites `subtotal` and `total_due` with the caller
/// amount, so line items must reconcile against it; `validate` enforces the
/// tolerance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub line_items: Vec<InvoiceLineItem>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_due: Decimal,
    pub payment_platform: String,
    pub payment_link: String,
    pub payment_instructions: String,
    pub net_terms: String,
    pub late_fee: String,
}

impl InvoiceDetails {
    pub fn line_item_total(&self) -> Decimal {
        self.line_items.iter().map(|item| item.amount).sum()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.line_items.is_empty() {
            return Err(DomainError::InvariantViolation(
                "invoice details must contain at least one line item".to_owned(),
            ));
        }
        if self.invoice_number.trim().is_empty() {
            return Err(DomainError::InvariantViolation(
                "invoice number must not be empty".to_owned(),
            ));
        }
        let drift = (self.line_item_total() - self.total_due).abs();
        if drift > Decimal::new(1, 2) {
            return Err(DomainError::InvariantViolation(format!(
                "line items sum to {} but total due is {}",
                self.line_item_total(),
                self.total_due
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub project_id: ProjectId,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub stripe_intent_id: Option<String>,
    pub details: InvoiceDetails,
    pub created_at: DateTime<Utc>,
}
