use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::page::{PageParams, SortOrder};
use crate::models::project::{
    MemberDetail, Project, ProjectMember, ProjectPatch, ProjectSummary,
};
use crate::models::task::{Task, TaskFilter, TaskPatch, TaskSummary};
use crate::models::user::{PublicUser, RefreshTokenRecord, User};
use crate::store::Store;

/// In-memory store used by the test suites. A single `RwLock` over all tables
/// makes every operation atomic, which matches the transactional guarantees
/// the services rely on (project creation, conditional token delete).
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    projects: HashMap<Uuid, Project>,
    members: Vec<ProjectMember>,
    tasks: HashMap<Uuid, Task>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_projects(projects: &mut [Project], sort_by: Option<&str>, order: SortOrder) {
    match sort_by {
        Some("name") => projects.sort_by(|a, b| a.name.cmp(&b.name)),
        Some("updated_at") => projects.sort_by_key(|p| p.updated_at),
        _ => projects.sort_by_key(|p| p.created_at),
    }
    if order == SortOrder::Desc {
        projects.reverse();
    }
}

fn sort_tasks(tasks: &mut [Task], sort_by: Option<&str>, order: SortOrder) {
    match sort_by {
        Some("title") => tasks.sort_by(|a, b| a.title.cmp(&b.title)),
        Some("updated_at") => tasks.sort_by_key(|t| t.updated_at),
        Some("due_date") => tasks.sort_by_key(|t| t.due_date),
        Some("priority") => tasks.sort_by_key(|t| t.priority),
        Some("status") => tasks.sort_by_key(|t| t.status),
        _ => tasks.sort_by_key(|t| t.created_at),
    }
    if order == SortOrder::Desc {
        tasks.reverse();
    }
}

fn paginate<T>(items: Vec<T>, page: &PageParams) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let page_items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (page_items, total)
}

#[async_trait]
impl Store for MemStore {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            // Mirrors the unique constraint in the SQL schema.
            return Err(AppError::Conflict("Resource already exists".into()));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email || u.username == username)
            .cloned())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<PublicUser>, AppError> {
        let needle = query.to_lowercase();
        let mut users: Vec<PublicUser> = self
            .inner
            .read()
            .await
            .users
            .values()
            .filter(|u| {
                u.username.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .map(PublicUser::from)
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.truncate(20);
        Ok(users)
    }

    async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .refresh_tokens
            .insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(self.inner.read().await.refresh_tokens.get(token).cloned())
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<bool, AppError> {
        Ok(self
            .inner
            .write()
            .await
            .refresh_tokens
            .remove(token)
            .is_some())
    }

    async fn delete_user_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner
            .refresh_tokens
            .get(token)
            .map_or(false, |r| r.user_id == user_id)
        {
            inner.refresh_tokens.remove(token);
        }
        Ok(())
    }

    async fn delete_all_refresh_tokens(&self, user_id: Uuid) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .refresh_tokens
            .retain(|_, r| r.user_id != user_id);
        Ok(())
    }

    async fn create_project(
        &self,
        project: &Project,
        admin: &ProjectMember,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.projects.insert(project.id, project.clone());
        inner.members.push(admin.clone());
        Ok(())
    }

    async fn project_by_id(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        Ok(self.inner.read().await.projects.get(&id).cloned())
    }

    async fn member_details(&self, project_id: Uuid) -> Result<Vec<MemberDetail>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .members
            .iter()
            .filter(|m| m.project_id == project_id)
            .filter_map(|m| {
                inner.users.get(&m.user_id).map(|user| MemberDetail {
                    user_id: m.user_id,
                    role: m.role,
                    user: PublicUser::from(user.clone()),
                })
            })
            .collect())
    }

    async fn membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectMember>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .members
            .iter()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .cloned())
    }

    async fn projects_for_user(
        &self,
        user_id: Uuid,
        page: &PageParams,
    ) -> Result<(Vec<ProjectSummary>, u64), AppError> {
        let inner = self.inner.read().await;
        let mut projects: Vec<Project> = inner
            .projects
            .values()
            .filter(|p| {
                inner
                    .members
                    .iter()
                    .any(|m| m.project_id == p.id && m.user_id == user_id)
            })
            .cloned()
            .collect();
        sort_projects(&mut projects, page.sort_by.as_deref(), page.sort_order);

        let (page_items, total) = paginate(projects, page);
        let summaries = page_items
            .into_iter()
            .map(|project| {
                let members = inner
                    .members
                    .iter()
                    .filter(|m| m.project_id == project.id)
                    .cloned()
                    .collect();
                let task_count = inner
                    .tasks
                    .values()
                    .filter(|t| t.project_id == project.id)
                    .count() as i64;
                ProjectSummary {
                    project,
                    members,
                    task_count,
                }
            })
            .collect();
        Ok((summaries, total))
    }

    async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> Result<Project, AppError> {
        let mut inner = self.inner.write().await;
        let project = inner
            .projects
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
        if let Some(name) = &patch.name {
            project.name = name.clone();
        }
        if let Some(description) = &patch.description {
            project.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        project.updated_at = chrono::Utc::now();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.projects.remove(&id);
        inner.members.retain(|m| m.project_id != id);
        inner.tasks.retain(|_, t| t.project_id != id);
        Ok(())
    }

    async fn add_member(&self, member: &ProjectMember) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner
            .members
            .iter()
            .any(|m| m.project_id == member.project_id && m.user_id == member.user_id)
        {
            return Err(AppError::Conflict("Resource already exists".into()));
        }
        inner.members.push(member.clone());
        Ok(())
    }

    async fn remove_member(&self, project_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .members
            .retain(|m| !(m.project_id == project_id && m.user_id == user_id));
        Ok(())
    }

    async fn task_summaries(&self, project_id: Uuid) -> Result<Vec<TaskSummary>, AppError> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<&Task> = inner
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .collect();
        tasks.sort_by_key(|t| std::cmp::Reverse(t.created_at));
        Ok(tasks
            .into_iter()
            .map(|t| TaskSummary {
                id: t.id,
                title: t.title.clone(),
                status: t.status,
                priority: t.priority,
            })
            .collect())
    }

    async fn create_task(&self, task: &Task) -> Result<(), AppError> {
        self.inner.write().await.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn task_by_id(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.inner.read().await.tasks.get(&id).cloned())
    }

    async fn tasks_for_project(
        &self,
        project_id: Uuid,
        filter: &TaskFilter,
        page: &PageParams,
    ) -> Result<(Vec<Task>, u64), AppError> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| filter.priority.map_or(true, |p| t.priority == p))
            .filter(|t| {
                filter
                    .assigned_to
                    .map_or(true, |user| t.assigned_to == Some(user))
            })
            .cloned()
            .collect();
        sort_tasks(&mut tasks, page.sort_by.as_deref(), page.sort_order);
        Ok(paginate(tasks, page))
    }

    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<Task, AppError> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
        task.apply(patch);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), AppError> {
        self.inner.write().await.tasks.remove(&id);
        Ok(())
    }
}
