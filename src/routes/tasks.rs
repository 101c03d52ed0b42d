use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::page::{PageParams, SortOrder};
use crate::models::task::{TaskFilter, TaskPatch, TaskPriority, TaskStatus};
use crate::models::ApiResponse;
use crate::services::NewTask;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Pagination and filter parameters for the task list, flattened into one
/// struct because `serde_urlencoded` cannot deserialize nested flattens.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
}

#[post("/{project_id}/tasks")]
pub async fn create_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<CreateTaskRequest>,
) -> Result<impl Responder, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let task = state
        .tasks
        .create(
            path.into_inner(),
            user.id(),
            NewTask {
                title: body.title,
                description: body.description,
                priority: body.priority,
                assigned_to: body.assigned_to,
                due_date: body.due_date,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok("Task created successfully", task)))
}

#[get("/{project_id}/tasks")]
pub async fn list_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<TaskListQuery>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    let page = PageParams::new(query.page, query.limit, query.sort_by, query.sort_order);
    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        assigned_to: query.assigned_to,
    };
    let (tasks, page_info) = state
        .tasks
        .list_by_project(path.into_inner(), user.id(), page, filter)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paginated(
        "Tasks retrieved successfully",
        tasks,
        page_info,
    )))
}

#[get("/{project_id}/tasks/{task_id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<impl Responder, AppError> {
    let (_, task_id) = path.into_inner();
    let task = state.tasks.get(task_id, user.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Task retrieved successfully", task)))
}

#[put("/{project_id}/tasks/{task_id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<TaskPatch>,
) -> Result<impl Responder, AppError> {
    body.validate()?;
    let (_, task_id) = path.into_inner();
    let task = state
        .tasks
        .update(task_id, user.id(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Task updated successfully", task)))
}

#[delete("/{project_id}/tasks/{task_id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<impl Responder, AppError> {
    let (_, task_id) = path.into_inner();
    state.tasks.delete(task_id, user.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Task deleted successfully")))
}
