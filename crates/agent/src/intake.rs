use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use freeflow_core::DomainError;

use crate::llm::LlmClient;
use crate::sanitize::strip_code_fence;
use crate::{AgentOutcome, AgentSource};

const SYSTEM_PROMPT: &str = r#"You are an AI intake agent for a freelancer workflow system.
Your job is to extract structured information from raw client inquiries.

Extract and return JSON with this exact structure:
{
    "client": {
        "name": "extracted name",
        "email": "extracted email",
        "company": "extracted company if mentioned"
    },
    "project": {
        "title": "project title",
        "description": "project description",
        "timeline": "extracted timeline",
        "budget": "extracted budget amount as number or null"
    },
    "confidence": {
        "budget": 0.0-1.0,
        "timeline": 0.0-1.0
    },
    "status": "intake_complete" or "needs_more_info"
}

Be thorough but concise. If information is missing or unclear, set confidence scores lower."#;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeClient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeProject {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub budget: Option<Decimal>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeConfidence {
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub timeline: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeStatus {
    #[serde(rename = "intake_complete")]
    IntakeComplete,
    #[serde(rename = "needs_more_info")]
    NeedsMoreInfo,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntakeResult {
    pub client: IntakeClient,
    pub project: IntakeProject,
    pub confidence: IntakeConfidence,
    pub status: IntakeStatus,
}

impl IntakeResult {
    pub fn validate(&self) -> Result<(), DomainError> {
        for (label, score) in
            [("confidence.budget", self.confidence.budget), ("confidence.timeline", self.confidence.timeline)]
        {
            if !(0.0..=1.0).contains(&score) {
                return Err(DomainError::InvariantViolation(format!(
                    "{label} must be within 0.0..=1.0, got {score}"
                )));
            }
        }
        Ok(())
    }
}

/// Convert an unstructured inquiry into a structured intake record. Always
/// succeeds: on any transport, parse, or validation failure the fallback
/// routes the inquiry to the needs-more-info branch with the raw text kept
/// verbatim as the project description.
pub async fn process_inquiry(llm: &dyn LlmClient, raw_text: &str) -> AgentOutcome<IntakeResult> {
    match extract(llm, raw_text).await {
        Ok(result) => AgentOutcome { payload: result, source: AgentSource::Model },
        Err(reason) => {
            warn!(event_name = "agent.intake.fallback", reason = %reason, "intake agent fell back");
            AgentOutcome::fallback(fallback(raw_text), reason)
        }
    }
}

async fn extract(llm: &dyn LlmClient, raw_text: &str) -> Result<IntakeResult, String> {
    let user_prompt = format!("Extract project information from this inquiry: {raw_text}");
    let completion = llm
        .complete(SYSTEM_PROMPT, &user_prompt)
        .await
        .map_err(|error| format!("llm call failed: {error}"))?;

    let cleaned = strip_code_fence(&completion);
    let result: IntakeResult = serde_json::from_str(cleaned)
        .map_err(|error| format!("response was not valid intake JSON: {error}"))?;
    result.validate().map_err(|error| error.to_string())?;

    Ok(result)
}

/// Deterministic substitute when extraction fails: empty client fields, the
/// raw inquiry preserved as the description, zero confidence, and
/// needs-more-info status.
pub fn fallback(raw_text: &str) -> IntakeResult {
    IntakeResult {
        client: IntakeClient::default(),
        project: IntakeProject {
            title: String::new(),
            description: raw_text.to_owned(),
            timeline: String::new(),
            budget: None,
        },
        confidence: IntakeConfidence { budget: 0.0, timeline: 0.0 },
        status: IntakeStatus::NeedsMoreInfo,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::llm::{FailingLlmClient, StaticLlmClient};

    use super::{process_inquiry, IntakeStatus};

    const INQUIRY: &str = "Hi, I'm Jane Doe (jane@x.com). I need a landing page, \
                           budget $5,000, ideally done in 3 weeks.";

    #[tokio::test]
    async fn outage_falls_back_with_raw_text_preserved() {
        let outcome = process_inquiry(&FailingLlmClient, INQUIRY).await;

        assert!(outcome.is_fallback());
        assert_eq!(outcome.payload.status, IntakeStatus::NeedsMoreInfo);
        assert_eq!(outcome.payload.project.description, INQUIRY);
        assert_eq!(outcome.payload.confidence.budget, 0.0);
        assert_eq!(outcome.payload.confidence.timeline, 0.0);
        assert_eq!(outcome.payload.client.name, "");
        assert_eq!(outcome.payload.project.budget, None);
    }

    #[tokio::test]
    async fn fenced_model_response_is_parsed() {
        let llm = StaticLlmClient::new(
            r#"```json
{
    "client": {"name": "Jane Doe", "email": "jane@x.com", "company": "Doe LLC"},
    "project": {"title": "Landing page", "description": "Marketing landing page", "timeline": "3 weeks", "budget": 5000},
    "confidence": {"budget": 0.9, "timeline": 0.8},
    "status": "intake_complete"
}
```"#,
        );

        let outcome = process_inquiry(&llm, INQUIRY).await;

        assert!(!outcome.is_fallback());
        assert_eq!(outcome.payload.status, IntakeStatus::IntakeComplete);
        assert_eq!(outcome.payload.client.name, "Jane Doe");
        assert_eq!(outcome.payload.project.budget, Some(Decimal::new(5_000, 0)));
    }

    #[tokio::test]
    async fn out_of_range_confidence_falls_back() {
        let llm = StaticLlmClient::new(
            r#"{
    "client": {"name": "Jane", "email": "jane@x.com", "company": ""},
    "project": {"title": "Site", "description": "Site build", "timeline": "", "budget": null},
    "confidence": {"budget": 3.5, "timeline": 0.2},
    "status": "intake_complete"
}"#,
        );

        let outcome = process_inquiry(&llm, INQUIRY).await;

        assert!(outcome.is_fallback());
        assert_eq!(outcome.payload.status, IntakeStatus::NeedsMoreInfo);
        assert_eq!(outcome.payload.project.description, INQUIRY);
    }

    #[tokio::test]
    async fn unknown_status_string_falls_back() {
        let llm = StaticLlmClient::new(
            r#"{
    "client": {"name": "", "email": "", "company": ""},
    "project": {"title": "", "description": "", "timeline": "", "budget": null},
    "confidence": {"budget": 0.0, "timeline": 0.0},
    "status": "halfway_done"
}"#,
        );

        let outcome = process_inquiry(&llm, INQUIRY).await;
        assert!(outcome.is_fallback());
    }
}
