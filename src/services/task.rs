use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::authz;
use crate::error::AppError;
use crate::models::page::{PageInfo, PageParams};
use crate::models::project::ProjectMember;
use crate::models::task::{Task, TaskFilter, TaskPatch, TaskPriority};
use crate::models::user::UserRole;
use crate::store::Store;

/// Input for task creation, already validated at the boundary.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Task CRUD scoped to a project, enforcing admin-only creation and
/// role-gated visibility.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Only a project ADMIN may create tasks. The creator is the requester
    /// and is immutable from then on.
    pub async fn create(
        &self,
        project_id: Uuid,
        requester_id: Uuid,
        input: NewTask,
    ) -> Result<Task, AppError> {
        let membership = self.store.membership(project_id, requester_id).await?;
        if membership.map_or(true, |m| m.role != UserRole::Admin) {
            return Err(AppError::Authorization(
                "Only project admins can create tasks".into(),
            ));
        }

        let task = Task::new(
            project_id,
            requester_id,
            input.title,
            input.description,
            input.priority,
            input.assigned_to,
            input.due_date,
        );
        self.store.create_task(&task).await?;
        log::info!("task created: {} in project {}", task.id, project_id);
        Ok(task)
    }

    pub async fn get(&self, task_id: Uuid, requester_id: Uuid) -> Result<Task, AppError> {
        let (task, _) = self.get_with_membership(task_id, requester_id).await?;
        Ok(task)
    }

    /// The shared visibility gate: 404 for a missing task, 403 for a
    /// non-member, and for non-admin members 403 unless the task is assigned
    /// to them. Update and delete route through here first.
    async fn get_with_membership(
        &self,
        task_id: Uuid,
        requester_id: Uuid,
    ) -> Result<(Task, ProjectMember), AppError> {
        let task = self
            .store
            .task_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

        let membership = self
            .store
            .membership(task.project_id, requester_id)
            .await?
            .ok_or_else(|| {
                AppError::Authorization("You do not have access to this task".into())
            })?;

        if !authz::can_view_task(&task, &membership) {
            return Err(AppError::Authorization(
                "You can only access tasks assigned to you".into(),
            ));
        }

        Ok((task, membership))
    }

    /// Lists a project's tasks. Non-admin members are force-scoped to their
    /// own assignments: any caller-supplied assignee filter is overridden, by
    /// design, so a USER can never enumerate someone else's tasks.
    pub async fn list_by_project(
        &self,
        project_id: Uuid,
        requester_id: Uuid,
        page: PageParams,
        mut filter: TaskFilter,
    ) -> Result<(Vec<Task>, PageInfo), AppError> {
        let membership = self
            .store
            .membership(project_id, requester_id)
            .await?
            .ok_or_else(|| {
                AppError::Authorization("You are not a member of this project".into())
            })?;

        if membership.role != UserRole::Admin {
            filter.assigned_to = Some(requester_id);
        }

        let (tasks, total) = self
            .store
            .tasks_for_project(project_id, &filter, &page)
            .await?;
        Ok((tasks, PageInfo::new(&page, total)))
    }

    /// Applies a partial patch. Runs the same visibility gate as `get`, so a
    /// non-admin cannot update a task that is not assigned to them.
    pub async fn update(
        &self,
        task_id: Uuid,
        requester_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Task, AppError> {
        self.get_with_membership(task_id, requester_id).await?;
        let updated = self.store.update_task(task_id, &patch).await?;
        log::info!("task updated: {} by {}", task_id, requester_id);
        Ok(updated)
    }

    /// Deletable by the original creator or a project admin, after the
    /// visibility gate.
    pub async fn delete(&self, task_id: Uuid, requester_id: Uuid) -> Result<(), AppError> {
        let (task, membership) = self.get_with_membership(task_id, requester_id).await?;

        if !authz::can_delete_task(&task, requester_id, &membership) {
            return Err(AppError::Authorization(
                "Only the task creator or a project admin can delete this task".into(),
            ));
        }

        self.store.delete_task(task_id).await?;
        log::info!("task deleted: {} by {}", task_id, requester_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::Project;
    use crate::models::task::TaskStatus;
    use crate::models::user::User;
    use crate::store::MemStore;

    struct Fixture {
        tasks: TaskService,
        store: Arc<MemStore>,
        project_id: Uuid,
        admin: Uuid,
        member: Uuid,
    }

    async fn setup() -> Fixture {
        let store = Arc::new(MemStore::new());
        let tasks = TaskService::new(store.clone());

        let admin = User::new(
            "admin@example.com".into(),
            "admin".into(),
            "hash".into(),
            None,
            None,
        );
        let member = User::new(
            "member@example.com".into(),
            "member".into(),
            "hash".into(),
            None,
            None,
        );
        let (admin_id, member_id) = (admin.id, member.id);
        store.create_user(&admin).await.unwrap();
        store.create_user(&member).await.unwrap();

        let project = Project::new("Apollo".into(), None);
        let project_id = project.id;
        store
            .create_project(
                &project,
                &ProjectMember {
                    project_id,
                    user_id: admin_id,
                    role: UserRole::Admin,
                },
            )
            .await
            .unwrap();
        store
            .add_member(&ProjectMember {
                project_id,
                user_id: member_id,
                role: UserRole::User,
            })
            .await
            .unwrap();

        Fixture {
            tasks,
            store,
            project_id,
            admin: admin_id,
            member: member_id,
        }
    }

    fn new_task(title: &str, assigned_to: Option<Uuid>) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            priority: None,
            assigned_to,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_only_admins_create_tasks() {
        let f = setup().await;

        let task = f
            .tasks
            .create(f.project_id, f.admin, new_task("ok", None))
            .await
            .unwrap();
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.created_by, f.admin);

        let err = f
            .tasks
            .create(f.project_id, f.member, new_task("no", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        // Non-members (and unknown projects) fail the same way.
        let err = f
            .tasks
            .create(Uuid::new_v4(), f.admin, new_task("no", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_member_sees_only_assigned_tasks() {
        let f = setup().await;
        let mine = f
            .tasks
            .create(f.project_id, f.admin, new_task("mine", Some(f.member)))
            .await
            .unwrap();
        let other = f
            .tasks
            .create(f.project_id, f.admin, new_task("other", None))
            .await
            .unwrap();

        assert!(f.tasks.get(mine.id, f.member).await.is_ok());

        let err = f.tasks.get(other.id, f.member).await.unwrap_err();
        match err {
            AppError::Authorization(msg) => assert!(msg.contains("assigned to you")),
            other => panic!("expected Authorization, got {:?}", other),
        }

        // Admin sees both.
        assert!(f.tasks.get(mine.id, f.admin).await.is_ok());
        assert!(f.tasks.get(other.id, f.admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_scoping_overrides_member_filters() {
        let f = setup().await;
        f.tasks
            .create(f.project_id, f.admin, new_task("a", Some(f.member)))
            .await
            .unwrap();
        f.tasks
            .create(f.project_id, f.admin, new_task("b", Some(f.admin)))
            .await
            .unwrap();
        f.tasks
            .create(f.project_id, f.admin, new_task("c", None))
            .await
            .unwrap();

        // The member asks for the admin's tasks; the filter is overridden.
        let filter = TaskFilter {
            assigned_to: Some(f.admin),
            ..Default::default()
        };
        let (tasks, info) = f
            .tasks
            .list_by_project(
                f.project_id,
                f.member,
                PageParams::new(None, None, None, None),
                filter,
            )
            .await
            .unwrap();
        assert_eq!(info.total, 1);
        assert!(tasks.iter().all(|t| t.assigned_to == Some(f.member)));

        // The admin's own filters are honored.
        let filter = TaskFilter {
            assigned_to: Some(f.admin),
            ..Default::default()
        };
        let (tasks, _) = f
            .tasks
            .list_by_project(
                f.project_id,
                f.admin,
                PageParams::new(None, None, None, None),
                filter,
            )
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "b");

        // No filter: admin sees all three.
        let (tasks, _) = f
            .tasks
            .list_by_project(
                f.project_id,
                f.admin,
                PageParams::new(None, None, None, None),
                TaskFilter::default(),
            )
            .await
            .unwrap();
        assert_eq!(tasks.len(), 3);
    }

    #[tokio::test]
    async fn test_admin_filters_are_and_combined() {
        let f = setup().await;
        let mut input = new_task("high", None);
        input.priority = Some(TaskPriority::High);
        f.tasks.create(f.project_id, f.admin, input).await.unwrap();

        let mut input = new_task("high-assigned", Some(f.member));
        input.priority = Some(TaskPriority::High);
        f.tasks.create(f.project_id, f.admin, input).await.unwrap();

        let filter = TaskFilter {
            priority: Some(TaskPriority::High),
            assigned_to: Some(f.member),
            ..Default::default()
        };
        let (tasks, _) = f
            .tasks
            .list_by_project(
                f.project_id,
                f.admin,
                PageParams::new(None, None, None, None),
                filter,
            )
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "high-assigned");
    }

    #[tokio::test]
    async fn test_update_goes_through_visibility_gate() {
        let f = setup().await;
        let unassigned = f
            .tasks
            .create(f.project_id, f.admin, new_task("t", None))
            .await
            .unwrap();

        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        let err = f
            .tasks
            .update(unassigned.id, f.member, patch.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let updated = f.tasks.update(unassigned.id, f.admin, patch).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_any_status_transition_is_allowed() {
        let f = setup().await;
        let task = f
            .tasks
            .create(f.project_id, f.admin, new_task("free", None))
            .await
            .unwrap();

        // No transition graph: COMPLETED straight back to OPEN is fine.
        for status in [
            TaskStatus::Completed,
            TaskStatus::Open,
            TaskStatus::Archived,
            TaskStatus::InReview,
        ] {
            let patch = TaskPatch {
                status: Some(status),
                ..Default::default()
            };
            let updated = f.tasks.update(task.id, f.admin, patch).await.unwrap();
            assert_eq!(updated.status, status);
        }
    }

    #[tokio::test]
    async fn test_delete_requires_creator_or_admin() {
        let f = setup().await;
        let task = f
            .tasks
            .create(f.project_id, f.admin, new_task("t", Some(f.member)))
            .await
            .unwrap();

        // The assignee can see it but did not create it and is not admin.
        let err = f.tasks.delete(task.id, f.member).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        f.tasks.delete(task.id, f.admin).await.unwrap();
        assert!(f.store.task_by_id(task.id).await.unwrap().is_none());
    }
}
