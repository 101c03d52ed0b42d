use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::task::TaskSummary;
use crate::models::user::{PublicUser, UserRole};

/// Lifecycle status of a project. Corresponds to the `project_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectStatus {
    Active,
    Completed,
    Archived,
}

/// A project. Exclusively owns its member rows and tasks; deleting a project
/// removes both. Invariant: at least one member holds ADMIN at all times.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            status: ProjectStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The (project, user, role) relation governing a user's permissions within
/// one project, independent of their global role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: UserRole,
}

/// Member row enriched with the user's public profile, as returned by
/// project detail and member-management endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub user_id: Uuid,
    pub role: UserRole,
    pub user: PublicUser,
}

/// Full project view: the project plus member details and task summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<MemberDetail>,
    pub tasks: Vec<TaskSummary>,
}

/// List-view projection: slim member rows and a task count instead of the
/// full relations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMember>,
    pub task_count: i64,
}

/// Partial project update; absent fields are unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}
