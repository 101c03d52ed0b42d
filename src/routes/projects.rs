use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::page::PageQuery;
use crate::models::project::ProjectPatch;
use crate::models::user::UserRole;
use crate::models::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    pub role: Option<UserRole>,
}

#[post("")]
pub async fn create_project(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreateProjectRequest>,
) -> Result<impl Responder, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let project = state
        .projects
        .create(body.name, body.description, user.id())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok("Project created successfully", project)))
}

/// Lists the caller's projects, paginated.
#[get("")]
pub async fn list_projects(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, AppError> {
    let (projects, page_info) = state
        .projects
        .list(user.id(), query.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paginated(
        "Projects retrieved successfully",
        projects,
        page_info,
    )))
}

#[get("/{id}")]
pub async fn get_project(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let project = state.projects.get(path.into_inner(), user.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Project retrieved successfully", project)))
}

#[put("/{id}")]
pub async fn update_project(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<ProjectPatch>,
) -> Result<impl Responder, AppError> {
    body.validate()?;
    let project = state
        .projects
        .update(path.into_inner(), user.id(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Project updated successfully", project)))
}

#[delete("/{id}")]
pub async fn delete_project(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    state.projects.delete(path.into_inner(), user.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Project deleted successfully")))
}

#[post("/{project_id}/members")]
pub async fn add_member(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<AddMemberRequest>,
) -> Result<impl Responder, AppError> {
    let member = state
        .projects
        .add_member(path.into_inner(), user.id(), body.user_id, body.role)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok("Member added successfully", member)))
}

#[delete("/{project_id}/members/{member_id}")]
pub async fn remove_member(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<impl Responder, AppError> {
    let (project_id, member_id) = path.into_inner();
    state
        .projects
        .remove_member(project_id, user.id(), member_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Member removed successfully")))
}
