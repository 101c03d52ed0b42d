use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::page::{PageParams, SortOrder};
use crate::models::project::{
    MemberDetail, Project, ProjectMember, ProjectPatch, ProjectSummary,
};
use crate::models::task::{Task, TaskFilter, TaskPatch, TaskSummary};
use crate::models::user::{PublicUser, RefreshTokenRecord, User};
use crate::store::Store;

/// PostgreSQL-backed store.
///
/// Queries are bound at runtime; the schema lives in `migrations/`. Apart from
/// project creation nothing runs in an explicit transaction: the task update
/// is a read-modify-write sequence, and the membership checks in the services
/// read current state without row locks.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, username, password_hash, first_name, last_name, role, created_at";
const TASK_COLUMNS: &str = "id, project_id, title, description, status, priority, created_by, \
     assigned_to, due_date, created_at, updated_at";
const PROJECT_COLUMNS: &str = "id, name, description, status, created_at, updated_at";

/// Maps a caller-supplied sort key onto a real column, defaulting to
/// `created_at`. Keys never reach the SQL string unvalidated.
fn sort_column(sort_by: Option<&str>, allowed: &[&'static str]) -> &'static str {
    sort_by
        .and_then(|key| allowed.iter().find(|col| **col == key))
        .copied()
        .unwrap_or("created_at")
}

fn sort_direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

const PROJECT_SORT_KEYS: [&str; 3] = ["created_at", "updated_at", "name"];
const TASK_SORT_KEYS: [&str; 6] = [
    "created_at",
    "updated_at",
    "title",
    "due_date",
    "priority",
    "status",
];

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO users (id, email, username, password_hash, first_name, last_name, role, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1 OR username = $2",
            USER_COLUMNS
        ))
        .bind(email)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn search_users(&self, query: &str) -> Result<Vec<PublicUser>, AppError> {
        let pattern = format!("%{}%", query);
        let users = sqlx::query_as::<_, PublicUser>(
            "SELECT id, email, username, first_name, last_name, role, created_at \
             FROM users WHERE username ILIKE $1 OR email ILIKE $1 \
             ORDER BY username LIMIT 20",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        sqlx::query("INSERT INTO refresh_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&record.token)
            .bind(record.user_id)
            .bind(record.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT token, user_id, expires_at FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all_refresh_tokens(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_project(
        &self,
        project: &Project,
        admin: &ProjectMember,
    ) -> Result<(), AppError> {
        // One transaction: a project without an admin member must never be
        // observable.
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO projects (id, name, description, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(admin.project_id)
            .bind(admin.user_id)
            .bind(admin.role)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn project_by_id(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }

    async fn member_details(&self, project_id: Uuid) -> Result<Vec<MemberDetail>, AppError> {
        let rows = sqlx::query(
            "SELECT m.user_id, m.role AS member_role, \
                    u.id, u.email, u.username, u.first_name, u.last_name, \
                    u.role AS user_role, u.created_at \
             FROM project_members m JOIN users u ON u.id = m.user_id \
             WHERE m.project_id = $1",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(MemberDetail {
                    user_id: row.try_get("user_id")?,
                    role: row.try_get("member_role")?,
                    user: PublicUser {
                        id: row.try_get("id")?,
                        email: row.try_get("email")?,
                        username: row.try_get("username")?,
                        first_name: row.try_get("first_name")?,
                        last_name: row.try_get("last_name")?,
                        role: row.try_get("user_role")?,
                        created_at: row.try_get("created_at")?,
                    },
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(Into::into)
    }

    async fn membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectMember>, AppError> {
        let member = sqlx::query_as::<_, ProjectMember>(
            "SELECT project_id, user_id, role FROM project_members \
             WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn projects_for_user(
        &self,
        user_id: Uuid,
        page: &PageParams,
    ) -> Result<(Vec<ProjectSummary>, u64), AppError> {
        let column = sort_column(page.sort_by.as_deref(), &PROJECT_SORT_KEYS);
        let direction = sort_direction(page.sort_order);

        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT p.{} FROM projects p \
             JOIN project_members m ON m.project_id = p.id \
             WHERE m.user_id = $1 \
             ORDER BY p.{} {} LIMIT $2 OFFSET $3",
            PROJECT_COLUMNS.replace(", ", ", p."),
            column,
            direction
        ))
        .bind(user_id)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_members WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(projects.len());
        for project in projects {
            let members = sqlx::query_as::<_, ProjectMember>(
                "SELECT project_id, user_id, role FROM project_members WHERE project_id = $1",
            )
            .bind(project.id)
            .fetch_all(&self.pool)
            .await?;

            let task_count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
                    .bind(project.id)
                    .fetch_one(&self.pool)
                    .await?;

            summaries.push(ProjectSummary {
                project,
                members,
                task_count,
            });
        }

        Ok((summaries, total as u64))
    }

    async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> Result<Project, AppError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 status = COALESCE($4, status), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(project)
    }

    async fn delete_project(&self, id: Uuid) -> Result<(), AppError> {
        // Members and tasks cascade via foreign keys.
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_member(&self, member: &ProjectMember) -> Result<(), AppError> {
        sqlx::query("INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(member.project_id)
            .bind(member.user_id)
            .bind(member.role)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_member(&self, project_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn task_summaries(&self, project_id: Uuid) -> Result<Vec<TaskSummary>, AppError> {
        let tasks = sqlx::query_as::<_, TaskSummary>(
            "SELECT id, title, status, priority FROM tasks \
             WHERE project_id = $1 ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn create_task(&self, task: &Task) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO tasks (id, project_id, title, description, status, priority, \
                                created_by, assigned_to, due_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(task.id)
        .bind(task.project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.created_by)
        .bind(task.assigned_to)
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn task_by_id(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn tasks_for_project(
        &self,
        project_id: Uuid,
        filter: &TaskFilter,
        page: &PageParams,
    ) -> Result<(Vec<Task>, u64), AppError> {
        // Dynamically appended, AND-combined conditions; values are always
        // bound, never interpolated.
        let mut conditions = String::new();
        let mut param = 2;
        if filter.status.is_some() {
            conditions.push_str(&format!(" AND status = ${}", param));
            param += 1;
        }
        if filter.priority.is_some() {
            conditions.push_str(&format!(" AND priority = ${}", param));
            param += 1;
        }
        if filter.assigned_to.is_some() {
            conditions.push_str(&format!(" AND assigned_to = ${}", param));
            param += 1;
        }

        let column = sort_column(page.sort_by.as_deref(), &TASK_SORT_KEYS);
        let direction = sort_direction(page.sort_order);

        let list_sql = format!(
            "SELECT {} FROM tasks WHERE project_id = $1{} ORDER BY {} {} LIMIT ${} OFFSET ${}",
            TASK_COLUMNS,
            conditions,
            column,
            direction,
            param,
            param + 1
        );
        let count_sql = format!(
            "SELECT COUNT(*) FROM tasks WHERE project_id = $1{}",
            conditions
        );

        let mut list_query = sqlx::query_as::<_, Task>(&list_sql).bind(project_id);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(project_id);
        if let Some(status) = filter.status {
            list_query = list_query.bind(status);
            count_query = count_query.bind(status);
        }
        if let Some(priority) = filter.priority {
            list_query = list_query.bind(priority);
            count_query = count_query.bind(priority);
        }
        if let Some(assigned_to) = filter.assigned_to {
            list_query = list_query.bind(assigned_to);
            count_query = count_query.bind(assigned_to);
        }
        list_query = list_query
            .bind(page.limit as i64)
            .bind(page.offset() as i64);

        let tasks = list_query.fetch_all(&self.pool).await?;
        let total = count_query.fetch_one(&self.pool).await?;
        Ok((tasks, total as u64))
    }

    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<Task, AppError> {
        // Read-modify-write; RowNotFound surfaces as 404 via the From impl.
        let mut task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        task.apply(patch);

        sqlx::query(
            "UPDATE tasks SET title = $2, description = $3, status = $4, priority = $5, \
                 assigned_to = $6, due_date = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.assigned_to)
        .bind(task.due_date)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
