//!
//! # Storage
//!
//! The services talk to persistence through the [`Store`] trait. The
//! production implementation is [`PgStore`] (sqlx/PostgreSQL); [`MemStore`]
//! backs the test suites with identical semantics.
//!
//! Entity identity and timestamps are decided by the services; the store only
//! persists and queries. Two methods carry invariant weight:
//! `create_project` must be atomic (project plus initial admin membership),
//! and `delete_refresh_token` reports whether a row was actually removed so
//! rotation can be single-use.

pub mod mem;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::page::PageParams;
use crate::models::project::{
    MemberDetail, Project, ProjectMember, ProjectPatch, ProjectSummary,
};
use crate::models::task::{Task, TaskFilter, TaskPatch, TaskSummary};
use crate::models::user::{PublicUser, RefreshTokenRecord, User};

pub use mem::MemStore;
pub use pg::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // ----- users -----
    async fn create_user(&self, user: &User) -> Result<(), AppError>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, AppError>;
    async fn search_users(&self, query: &str) -> Result<Vec<PublicUser>, AppError>;

    // ----- refresh tokens -----
    async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;
    async fn refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, AppError>;
    /// Deletes the row for `token`; returns whether a row existed. The caller
    /// treats `false` as "already rotated or revoked".
    async fn delete_refresh_token(&self, token: &str) -> Result<bool, AppError>;
    /// Deletes the row only when both user and token match (single-session logout).
    async fn delete_user_refresh_token(&self, user_id: Uuid, token: &str)
        -> Result<(), AppError>;
    /// Deletes every refresh token for the user (logout-everywhere).
    async fn delete_all_refresh_tokens(&self, user_id: Uuid) -> Result<(), AppError>;

    // ----- projects & membership -----
    /// Inserts the project and its initial admin membership atomically.
    async fn create_project(
        &self,
        project: &Project,
        admin: &ProjectMember,
    ) -> Result<(), AppError>;
    async fn project_by_id(&self, id: Uuid) -> Result<Option<Project>, AppError>;
    async fn member_details(&self, project_id: Uuid) -> Result<Vec<MemberDetail>, AppError>;
    async fn membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectMember>, AppError>;
    async fn projects_for_user(
        &self,
        user_id: Uuid,
        page: &PageParams,
    ) -> Result<(Vec<ProjectSummary>, u64), AppError>;
    async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> Result<Project, AppError>;
    /// Cascades member rows and tasks.
    async fn delete_project(&self, id: Uuid) -> Result<(), AppError>;
    async fn add_member(&self, member: &ProjectMember) -> Result<(), AppError>;
    async fn remove_member(&self, project_id: Uuid, user_id: Uuid) -> Result<(), AppError>;
    async fn task_summaries(&self, project_id: Uuid) -> Result<Vec<TaskSummary>, AppError>;

    // ----- tasks -----
    async fn create_task(&self, task: &Task) -> Result<(), AppError>;
    async fn task_by_id(&self, id: Uuid) -> Result<Option<Task>, AppError>;
    async fn tasks_for_project(
        &self,
        project_id: Uuid,
        filter: &TaskFilter,
        page: &PageParams,
    ) -> Result<(Vec<Task>, u64), AppError>;
    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<Task, AppError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), AppError>;
}

/// True when a stored refresh token is past its persisted expiry, regardless
/// of what the signed blob itself claims.
pub fn is_row_expired(record: &RefreshTokenRecord, now: DateTime<Utc>) -> bool {
    record.expires_at <= now
}
