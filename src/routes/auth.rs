use actix_web::{post, web, HttpResponse, Responder};
use validator::Validate;

use crate::auth::{
    AuthenticatedUser, LoginRequest, LoginResponse, LogoutRequest, RefreshRequest,
    RegisterRequest, TokenPair,
};
use crate::error::AppError;
use crate::models::ApiResponse;
use crate::state::AppState;

/// Creates a new user account. The response never carries the password hash.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    body.validate()?;
    let user = state.auth.register(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok("User registered successfully", user)))
}

/// Authenticates a user and returns the user plus an access/refresh pair.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    body.validate()?;
    let (user, tokens) = state.auth.login(&body.email, &body.password).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Login successful",
        LoginResponse { user, tokens },
    )))
}

/// Exchanges a refresh token for a new pair. The old token becomes invalid
/// whether or not its embedded expiry has elapsed.
#[post("/refresh-token")]
pub async fn refresh_token(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> Result<impl Responder, AppError> {
    body.validate()?;
    let tokens = state.auth.rotate(&body.refresh_token).await?;

    #[derive(serde::Serialize, serde::Deserialize, Debug)]
    struct Tokens {
        tokens: TokenPair,
    }
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Token refreshed successfully",
        Tokens { tokens },
    )))
}

/// Revokes the caller's sessions: the one matching the supplied refresh
/// token, or all of them when the body omits it.
#[post("/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: Option<web::Json<LogoutRequest>>,
) -> Result<impl Responder, AppError> {
    let token = body.and_then(|b| b.into_inner().refresh_token);
    state.auth.logout(user.id(), token.as_deref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Logged out successfully")))
}
