use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::client::ClientId;
use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

/// Project lifecycle stage. The pipeline only ever moves a project toward
/// `Done`; see `flows::engine` for the transition rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    Intake,
    Contract,
    Billing,
    Done,
}

impl ProjectStatus {
    /// Position in the Intake -> Contract -> Billing -> Done progression.
    pub fn stage_rank(&self) -> u8 {
        match self {
            Self::Intake => 0,
            Self::Contract => 1,
            Self::Billing => 2,
            Self::Done => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "Intake",
            Self::Contract => "Contract",
            Self::Billing => "Billing",
            Self::Done => "Done",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Intake" => Some(Self::Intake),
            "Contract" => Some(Self::Contract),
            "Billing" => Some(Self::Billing),
            "Done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub client_id: ClientId,
    pub title: String,
    pub description: String,
    pub budget: Option<Decimal>,
    pub timeline: Option<String>,
    pub status: ProjectStatus,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::ProjectStatus;

    #[test]
    fn stage_ranks_follow_pipeline_order() {
        assert!(ProjectStatus::Intake.stage_rank() < ProjectStatus::Contract.stage_rank());
        assert!(ProjectStatus::Contract.stage_rank() < ProjectStatus::Billing.stage_rank());
        assert!(ProjectStatus::Billing.stage_rank() < ProjectStatus::Done.stage_rank());
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in [
            ProjectStatus::Intake,
            ProjectStatus::Contract,
            ProjectStatus::Billing,
            ProjectStatus::Done,
        ] {
            assert_eq!(ProjectStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProjectStatus::parse("Archived"), None);
    }
}
