#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web, App, Error, HttpResponse};
use serde_json::{json, Value};
use uuid::Uuid;

use taskhive::auth::AuthMiddleware;
use taskhive::config::Config;
use taskhive::routes;
use taskhive::state::AppState;
use taskhive::store::MemStore;

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        jwt_secret: "test-access-secret".to_string(),
        jwt_refresh_secret: "test-refresh-secret".to_string(),
        access_ttl_minutes: 15,
        refresh_ttl_days: 7,
        // Low cost keeps the suite fast; production uses 10+.
        bcrypt_cost: 4,
    }
}

/// Builds the full app over an in-memory store, with the same middleware and
/// JSON config the binary uses.
pub async fn init_app(
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let state = AppState::new(Arc::new(MemStore::new()), &test_config());
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(routes::json_config())
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await
}

fn with_auth(builder: test::TestRequest, token: Option<&str>) -> test::TestRequest {
    match token {
        Some(token) => builder.insert_header(("Authorization", format!("Bearer {}", token))),
        None => builder,
    }
}

pub fn get(path: &str, token: Option<&str>) -> Request {
    with_auth(test::TestRequest::get().uri(path), token).to_request()
}

pub fn post(path: &str, token: Option<&str>, body: Value) -> Request {
    with_auth(test::TestRequest::post().uri(path), token)
        .set_json(body)
        .to_request()
}

pub fn put(path: &str, token: Option<&str>, body: Value) -> Request {
    with_auth(test::TestRequest::put().uri(path), token)
        .set_json(body)
        .to_request()
}

pub fn delete(path: &str, token: Option<&str>) -> Request {
    with_auth(test::TestRequest::delete().uri(path), token).to_request()
}

/// Calls the service and returns the status plus the parsed JSON envelope.
/// Middleware rejections surface as service errors, so those are rendered
/// through the error's response the same way the HTTP dispatcher would.
pub async fn call<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    match test::try_call_service(app, req).await {
        Ok(resp) => {
            let status = resp.status();
            let body = test::read_body_json(resp).await;
            (status, body)
        }
        Err(err) => {
            let resp = HttpResponse::from_error(err);
            let status = resp.status();
            let bytes = actix_web::body::to_bytes(resp.into_body())
                .await
                .expect("error response body");
            let body = serde_json::from_slice(&bytes).expect("error response is json");
            (status, body)
        }
    }
}

pub struct Session {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Registers and logs in a user, returning a live session.
pub async fn signup<S, B>(app: &S, email: &str, username: &str) -> Session
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let (status, _) = call(
        app,
        post(
            "/api/auth/register",
            None,
            json!({
                "email": email,
                "username": username,
                "password": "password123",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed");

    login(app, email).await
}

pub async fn login<S, B>(app: &S, email: &str) -> Session
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let (status, body) = call(
        app,
        post(
            "/api/auth/login",
            None,
            json!({ "email": email, "password": "password123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    let data = &body["data"];
    Session {
        user_id: data["user"]["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("user id in login response"),
        access_token: data["tokens"]["accessToken"]
            .as_str()
            .expect("access token")
            .to_string(),
        refresh_token: data["tokens"]["refreshToken"]
            .as_str()
            .expect("refresh token")
            .to_string(),
    }
}

/// Creates a project as the given session and returns its id.
pub async fn create_project<S, B>(app: &S, session: &Session, name: &str) -> Uuid
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let (status, body) = call(
        app,
        post(
            "/api/projects",
            Some(&session.access_token),
            json!({ "name": name }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "project creation failed: {}", body);
    body["data"]["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("project id")
}
