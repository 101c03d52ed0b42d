use actix_web::{get, web, HttpResponse, Responder};
use serde::Deserialize;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

/// Searches users by username or email substring, for member pickers.
#[get("/search")]
pub async fn search(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<SearchQuery>,
) -> Result<impl Responder, AppError> {
    let users = state.auth.search_users(&query.query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Users retrieved successfully", users)))
}
