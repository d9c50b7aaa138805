use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::project::ProjectId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Draft,
    Sent,
    AwaitingSignature,
    Signed,
    Blocked,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::AwaitingSignature => "AwaitingSignature",
            Self::Signed => "Signed",
            Self::Blocked => "Blocked",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Draft" => Some(Self::Draft),
            "Sent" => Some(Self::Sent),
            "AwaitingSignature" => Some(Self::AwaitingSignature),
            "Signed" => Some(Self::Signed),
            "Blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureProvider {
    HelloSign,
    DocuSign,
}

impl SignatureProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HelloSign => "HelloSign",
            Self::DocuSign => "DocuSign",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "HelloSign" => Some(Self::HelloSign),
            "DocuSign" => Some(Self::DocuSign),
            _ => None,
        }
    }
}

/// Variables for a freelance service agreement. Produced by the contract
/// agent (or its fallback); the PDF template consumes every field, so all of
/// them are required.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractVariables {
    pub client_name: String,
    pub client_company: String,
    pub client_email: String,
    pub freelancer_name: String,
    pub freelancer_business: String,
    pub freelancer_email: String,
    pub project_description: String,
    pub deliverables_list: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub milestone_1: String,
    pub milestone_2: String,
    pub milestone_3: String,
    pub project_budget: Decimal,
    pub payment_terms: String,
    pub invoice_platform: String,
    pub net_terms: String,
    pub late_fee: String,
    pub jurisdiction: String,
}

impl ContractVariables {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.deliverables_list.is_empty() {
            return Err(DomainError::InvariantViolation(
                "contract variables must list at least one deliverable".to_owned(),
            ));
        }
        if self.end_date < self.start_date {
            return Err(DomainError::InvariantViolation(format!(
                "contract end date {} precedes start date {}",
                self.end_date, self.start_date
            )));
        }
        for (label, milestone) in [
            ("milestone_1", &self.milestone_1),
            ("milestone_2", &self.milestone_2),
            ("milestone_3", &self.milestone_3),
        ] {
            if milestone.trim().is_empty() {
                return Err(DomainError::InvariantViolation(format!("{label} must not be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub project_id: ProjectId,
    pub variables: ContractVariables,
    pub signature_provider: SignatureProvider,
    pub signature_id: Option<String>,
    pub status: ContractStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
