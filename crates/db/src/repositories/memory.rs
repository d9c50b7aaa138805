use std::collections::HashMap;

use tokio::sync::RwLock;

use freeflow_core::audit::AgentEvent;
use freeflow_core::domain::client::{Client, ClientId};
use freeflow_core::domain::project::{Project, ProjectId};

use super::{ClientRepository, EventRepository, ProjectRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryClientRepository {
    clients: RwLock<HashMap<String, Client>>,
}

#[async_trait::async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        let clients = self.clients.read().await;
        Ok(clients.get(&id.0).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Client>, RepositoryError> {
        let clients = self.clients.read().await;
        Ok(clients.values().find(|client| client.email == email).cloned())
    }

    async fn list(&self) -> Result<Vec<Client>, RepositoryError> {
        let clients = self.clients.read().await;
        let mut all: Vec<Client> = clients.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn save(&self, client: Client) -> Result<(), RepositoryError> {
        let mut clients = self.clients.write().await;
        clients.insert(client.id.0.clone(), client);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<String, Project>>,
}

#[async_trait::async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn find_by_id(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError> {
        let projects = self.projects.read().await;
        Ok(projects.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        let projects = self.projects.read().await;
        let mut all: Vec<Project> = projects.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        let mut projects = self.projects.write().await;
        projects.insert(project.id.0.clone(), project);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEventRepository {
    events: RwLock<Vec<AgentEvent>>,
}

#[async_trait::async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn append(&self, event: AgentEvent) -> Result<(), RepositoryError> {
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AgentEvent>, RepositoryError> {
        let events = self.events.read().await;
        let mut all: Vec<AgentEvent> = events.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use freeflow_core::audit::{AgentEvent, EventKind, TraceId};
    use freeflow_core::domain::client::{Client, ClientId};
    use freeflow_core::domain::project::{Project, ProjectId, ProjectStatus};
    use freeflow_core::domain::user::UserId;

    use crate::repositories::{
        ClientRepository, EventRepository, InMemoryClientRepository, InMemoryEventRepository,
        InMemoryProjectRepository, ProjectRepository,
    };

    #[tokio::test]
    async fn client_round_trips_and_resolves_by_email() {
        let repo = InMemoryClientRepository::default();
        let client = Client {
            id: ClientId("c-1".to_owned()),
            name: "Jane Doe".to_owned(),
            email: "jane@x.com".to_owned(),
            company: None,
            phone: None,
            owner_id: UserId("u-1".to_owned()),
            created_at: Utc::now(),
        };

        repo.save(client.clone()).await.expect("save");
        let by_email = repo.find_by_email("jane@x.com").await.expect("lookup");
        assert_eq!(by_email.as_ref().map(|c| c.id.0.as_str()), Some("c-1"));
        assert_eq!(repo.find_by_email("nobody@x.com").await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn project_status_survives_the_round_trip() {
        let repo = InMemoryProjectRepository::default();
        let mut project = Project {
            id: ProjectId("p-1".to_owned()),
            client_id: ClientId("c-1".to_owned()),
            title: "Rebuild".to_owned(),
            description: "Full rebuild".to_owned(),
            budget: None,
            timeline: None,
            status: ProjectStatus::Intake,
            owner_id: UserId("u-1".to_owned()),
            created_at: Utc::now(),
        };

        repo.save(project.clone()).await.expect("save intake");
        project.status = ProjectStatus::Contract;
        repo.save(project.clone()).await.expect("save contract");

        let loaded = repo.find_by_id(&project.id).await.expect("find").expect("present");
        assert_eq!(loaded.status, ProjectStatus::Contract);
    }

    #[tokio::test]
    async fn events_list_newest_first_with_limit() {
        let repo = InMemoryEventRepository::default();
        let older = AgentEvent::new(
            TraceId::generate(),
            EventKind::IntakeCompleted,
            "project",
            "p-1",
            json!({}),
        );
        let mut newer = AgentEvent::new(
            TraceId::generate(),
            EventKind::InvoiceSent,
            "invoice",
            "i-1",
            json!({}),
        );
        newer.created_at = older.created_at + chrono::Duration::seconds(1);

        repo.append(older).await.expect("append");
        repo.append(newer.clone()).await.expect("append");

        let recent = repo.list_recent(1).await.expect("list");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, newer.id);
    }
}
