use chrono::{DateTime, Utc};
use sqlx::Row;

use freeflow_core::domain::contract::{
    Contract, ContractId, ContractStatus, ContractVariables, SignatureProvider,
};
use freeflow_core::domain::project::ProjectId;

use super::{parse_timestamp, ContractRepository, RepositoryError};
use crate::DbPool;

pub struct SqlContractRepository {
    pool: DbPool,
}

impl SqlContractRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_contract(row: &sqlx::sqlite::SqliteRow) -> Result<Contract, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let project_id: String =
        row.try_get("project_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let variables_json: String =
        row.try_get("variables").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let provider_str: String =
        row.try_get("signature_provider").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let signature_id: Option<String> =
        row.try_get("signature_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let signed_at_str: Option<String> =
        row.try_get("signed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let variables: ContractVariables = serde_json::from_str(&variables_json).map_err(|e| {
        RepositoryError::Decode(format!("contract.variables holds invalid JSON: {e}"))
    })?;
    let signature_provider = SignatureProvider::parse(&provider_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown signature provider `{provider_str}`"))
    })?;
    let status = ContractStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown contract status `{status_str}`"))
    })?;
    let signed_at = signed_at_str
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Contract {
        id: ContractId(id),
        project_id: ProjectId(project_id),
        variables,
        signature_provider,
        signature_id,
        status,
        signed_at,
        created_at: parse_timestamp(&created_at_str),
    })
}

#[async_trait::async_trait]
impl ContractRepository for SqlContractRepository {
    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, project_id, variables, signature_provider, signature_id, status,
                    signed_at, created_at
             FROM contract WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_contract(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<Contract>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, project_id, variables, signature_provider, signature_id, status,
                    signed_at, created_at
             FROM contract WHERE project_id = ? ORDER BY created_at DESC",
        )
        .bind(&project_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_contract).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, contract: Contract) -> Result<(), RepositoryError> {
        let variables_json = serde_json::to_string(&contract.variables).map_err(|e| {
            RepositoryError::Decode(format!("contract variables failed to serialize: {e}"))
        })?;

        sqlx::query(
            "INSERT INTO contract (id, project_id, variables, signature_provider, signature_id,
                                   status, signed_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 variables = excluded.variables,
                 signature_provider = excluded.signature_provider,
                 signature_id = excluded.signature_id,
                 status = excluded.status,
                 signed_at = excluded.signed_at",
        )
        .bind(&contract.id.0)
        .bind(&contract.project_id.0)
        .bind(variables_json)
        .bind(contract.signature_provider.as_str())
        .bind(&contract.signature_id)
        .bind(contract.status.as_str())
        .bind(contract.signed_at.map(|dt| dt.to_rfc3339()))
        .bind(contract.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
