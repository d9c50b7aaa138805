use sqlx::Row;

use freeflow_core::audit::{AgentEvent, EventKind, TraceId};

use super::{parse_timestamp, EventRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEventRepository {
    pool: DbPool,
}

impl SqlEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<AgentEvent, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let trace_id: String =
        row.try_get("trace_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind_str: String =
        row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let entity_type: String =
        row.try_get("entity_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let entity_id: String =
        row.try_get("entity_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let payload_json: String =
        row.try_get("payload").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let kind = EventKind::parse(&kind_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown event kind `{kind_str}`")))?;
    let payload = serde_json::from_str(&payload_json).map_err(|e| {
        RepositoryError::Decode(format!("agent_event.payload holds invalid JSON: {e}"))
    })?;

    Ok(AgentEvent {
        id,
        trace_id: TraceId(trace_id),
        kind,
        entity_type,
        entity_id,
        payload,
        created_at: parse_timestamp(&created_at_str),
    })
}

#[async_trait::async_trait]
impl EventRepository for SqlEventRepository {
    async fn append(&self, event: AgentEvent) -> Result<(), RepositoryError> {
        let payload_json = serde_json::to_string(&event.payload).map_err(|e| {
            RepositoryError::Decode(format!("event payload failed to serialize: {e}"))
        })?;

        sqlx::query(
            "INSERT INTO agent_event (id, trace_id, kind, entity_type, entity_id, payload, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(&event.trace_id.0)
        .bind(event.kind.as_str())
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(payload_json)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AgentEvent>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, trace_id, kind, entity_type, entity_id, payload, created_at
             FROM agent_event ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use freeflow_core::audit::{AgentEvent, EventKind, TraceId};

    use crate::connect_with_settings;
    use crate::migrations::run_pending;
    use crate::repositories::{EventRepository, SqlEventRepository};

    #[tokio::test]
    async fn appended_events_come_back_newest_first() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlEventRepository::new(pool.clone());

        let first = AgentEvent::new(
            TraceId::generate(),
            EventKind::IntakeCompleted,
            "project",
            "p-1",
            json!({"step": 1}),
        );
        let mut second = AgentEvent::new(
            TraceId::generate(),
            EventKind::ContractSent,
            "contract",
            "c-1",
            json!({"step": 2}),
        );
        second.created_at = first.created_at + chrono::Duration::seconds(5);

        repo.append(first.clone()).await.expect("append first");
        repo.append(second.clone()).await.expect("append second");

        let events = repo.list_recent(10).await.expect("list");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, second.id);
        assert_eq!(events[1].id, first.id);
        assert_eq!(events[0].kind, EventKind::ContractSent);

        let limited = repo.list_recent(1).await.expect("list limited");
        assert_eq!(limited.len(), 1);

        pool.close().await;
    }
}
