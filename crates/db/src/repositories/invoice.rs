use sqlx::Row;

use freeflow_core::domain::invoice::{Invoice, InvoiceDetails, InvoiceId, InvoiceStatus};
use freeflow_core::domain::project::ProjectId;

use super::{parse_date, parse_decimal, parse_timestamp, InvoiceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInvoiceRepository {
    pool: DbPool,
}

impl SqlInvoiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_invoice(row: &sqlx::sqlite::SqliteRow) -> Result<Invoice, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let project_id: String =
        row.try_get("project_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_str: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let due_date_str: String =
        row.try_get("due_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let stripe_intent_id: Option<String> =
        row.try_get("stripe_intent_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let details_json: String =
        row.try_get("details").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let details: InvoiceDetails = serde_json::from_str(&details_json).map_err(|e| {
        RepositoryError::Decode(format!("invoice.details holds invalid JSON: {e}"))
    })?;
    let status = InvoiceStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown invoice status `{status_str}`"))
    })?;

    Ok(Invoice {
        id: InvoiceId(id),
        project_id: ProjectId(project_id),
        amount: parse_decimal("invoice.amount", &amount_str)?,
        due_date: parse_date("invoice.due_date", &due_date_str)?,
        status,
        stripe_intent_id,
        details,
        created_at: parse_timestamp(&created_at_str),
    })
}

#[async_trait::async_trait]
impl InvoiceRepository for SqlInvoiceRepository {
    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, project_id, amount, due_date, status, stripe_intent_id, details, created_at
             FROM invoice WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_invoice(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<Invoice>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, project_id, amount, due_date, status, stripe_intent_id, details, created_at
             FROM invoice WHERE project_id = ? ORDER BY created_at DESC",
        )
        .bind(&project_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_invoice).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, invoice: Invoice) -> Result<(), RepositoryError> {
        let details_json = serde_json::to_string(&invoice.details).map_err(|e| {
            RepositoryError::Decode(format!("invoice details failed to serialize: {e}"))
        })?;

        sqlx::query(
            "INSERT INTO invoice (id, project_id, amount, due_date, status, stripe_intent_id,
                                  details, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 amount = excluded.amount,
                 due_date = excluded.due_date,
                 status = excluded.status,
                 stripe_intent_id = excluded.stripe_intent_id,
                 details = excluded.details",
        )
        .bind(&invoice.id.0)
        .bind(&invoice.project_id.0)
        .bind(invoice.amount.to_string())
        .bind(invoice.due_date.format("%Y-%m-%d").to_string())
        .bind(invoice.status.as_str())
        .bind(&invoice.stripe_intent_id)
        .bind(details_json)
        .bind(invoice.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
