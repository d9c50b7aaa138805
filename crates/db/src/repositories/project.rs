use sqlx::Row;

use freeflow_core::domain::client::ClientId;
use freeflow_core::domain::project::{Project, ProjectId, ProjectStatus};
use freeflow_core::domain::user::UserId;

use super::{parse_decimal, parse_timestamp, ProjectRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProjectRepository {
    pool: DbPool,
}

impl SqlProjectRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_project(row: &sqlx::sqlite::SqliteRow) -> Result<Project, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let client_id: String =
        row.try_get("client_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let budget_str: Option<String> =
        row.try_get("budget").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let timeline: Option<String> =
        row.try_get("timeline").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner_id: String =
        row.try_get("owner_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let budget = budget_str.map(|raw| parse_decimal("project.budget", &raw)).transpose()?;
    let status = ProjectStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown project status `{status_str}`"))
    })?;

    Ok(Project {
        id: ProjectId(id),
        client_id: ClientId(client_id),
        title,
        description,
        budget,
        timeline,
        status,
        owner_id: UserId(owner_id),
        created_at: parse_timestamp(&created_at_str),
    })
}

#[async_trait::async_trait]
impl ProjectRepository for SqlProjectRepository {
    async fn find_by_id(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, client_id, title, description, budget, timeline, status, owner_id, created_at
             FROM project WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_project(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, client_id, title, description, budget, timeline, status, owner_id, created_at
             FROM project ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_project).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO project (id, client_id, title, description, budget, timeline, status, owner_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 budget = excluded.budget,
                 timeline = excluded.timeline,
                 status = excluded.status",
        )
        .bind(&project.id.0)
        .bind(&project.client_id.0)
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.budget.map(|b| b.to_string()))
        .bind(&project.timeline)
        .bind(project.status.as_str())
        .bind(&project.owner_id.0)
        .bind(project.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
