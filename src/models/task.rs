use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Status of a task. No transition graph is enforced: any authorized update
/// may set any status from any status (ARCHIVED included as a side state).
/// Corresponds to the `task_status` SQL enum.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,
    InProgress,
    InReview,
    Completed,
    Archived,
}

/// Priority of a task. Corresponds to the `task_priority` SQL enum.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// A task, owned by exactly one project. The creator is immutable; the
/// assignee is a nullable, non-owning reference to a member's user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        project_id: Uuid,
        created_by: Uuid,
        title: String,
        description: Option<String>,
        priority: Option<TaskPriority>,
        assigned_to: Option<Uuid>,
        due_date: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            title,
            description,
            status: TaskStatus::Open,
            priority: priority.unwrap_or(TaskPriority::Medium),
            created_by,
            assigned_to,
            due_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update. Absent fields are unchanged; for
    /// `assigned_to` and `due_date` an explicit JSON `null` clears the field.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        self.updated_at = Utc::now();
    }
}

/// Slim task projection embedded in a project detail response.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

/// Distinguishes "field absent" (outer `None`, leave unchanged) from
/// "field explicitly null" (`Some(None)`, clear it).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial task update as carried by `PUT .../tasks/{taskId}`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Optional task-list filters, AND-combined. For non-admin requesters the
/// service overrides `assigned_to` with the requester's own id.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_task() -> Task {
        Task::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Write report".to_string(),
            Some("Quarterly numbers".to_string()),
            None,
            None,
            None,
        )
    }

    #[test]
    fn test_task_defaults() {
        let task = sample_task();
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(task.assigned_to.is_none());
    }

    #[test]
    fn test_patch_absent_fields_leave_task_unchanged() {
        let mut task = sample_task();
        let before = task.clone();
        task.apply(&TaskPatch::default());
        assert_eq!(task.title, before.title);
        assert_eq!(task.status, before.status);
        assert_eq!(task.assigned_to, before.assigned_to);
        assert_eq!(task.due_date, before.due_date);
    }

    #[test]
    fn test_patch_explicit_null_clears_assignee() {
        let mut task = sample_task();
        task.assigned_to = Some(Uuid::new_v4());

        let patch: TaskPatch = serde_json::from_str(r#"{"assignedTo": null}"#).unwrap();
        assert_eq!(patch.assigned_to, Some(None));

        task.apply(&patch);
        assert_eq!(task.assigned_to, None);
    }

    #[test]
    fn test_patch_absent_assignee_is_distinct_from_null() {
        let patch: TaskPatch = serde_json::from_str(r#"{"title": "New title"}"#).unwrap();
        assert_eq!(patch.assigned_to, None);
        assert_eq!(patch.title.as_deref(), Some("New title"));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(
            serde_json::from_str::<TaskPriority>("\"CRITICAL\"").unwrap(),
            TaskPriority::Critical
        );
    }
}
