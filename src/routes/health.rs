use actix_web::{get, HttpResponse, Responder};

/// Liveness probe; mounted outside the authenticated scope.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok"
    }))
}
