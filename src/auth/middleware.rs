use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::error::AppError;
use crate::state::AppState;

/// Bearer-token authentication for everything under `/api`.
///
/// Verifies the access token's signature and expiry, then inserts the decoded
/// [`crate::auth::Claims`] into request extensions for the
/// [`crate::auth::AuthenticatedUser`] extractor. Absent or invalid tokens
/// fail with 401 before any handler logic runs.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

// Public endpoints inside the wrapped scope: anything else requires a token.
const PUBLIC_PATHS: [&str; 3] = [
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/refresh-token",
];

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path();
        if PUBLIC_PATHS.iter().any(|p| path.starts_with(p)) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let keys = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state.keys.clone(),
            None => {
                let err = AppError::Internal("Application state is not configured".into());
                return Box::pin(async move { Err(err.into()) });
            }
        };

        match token {
            Some(token) => match keys.verify_access(token) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    let fut = self.service.call(req);
                    Box::pin(fut)
                }
                Err(app_err) => {
                    log::warn!("rejected access token on {}: {}", path, app_err);
                    Box::pin(async move { Err(app_err.into()) })
                }
            },
            None => {
                let app_err = AppError::Authentication("Access token is required".into());
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}
