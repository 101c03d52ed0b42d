pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;

use actix_web::web;
use std::collections::HashMap;

use crate::error::AppError;

/// Routes mounted under the authenticated `/api` scope.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::register)
            .service(auth::login)
            .service(auth::refresh_token)
            .service(auth::logout),
    )
    .service(web::scope("/users").service(users::search))
    .service(
        web::scope("/projects")
            .service(projects::create_project)
            .service(projects::list_projects)
            .service(projects::get_project)
            .service(projects::update_project)
            .service(projects::delete_project)
            .service(projects::add_member)
            .service(projects::remove_member)
            .service(tasks::create_task)
            .service(tasks::list_tasks)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    );
}

/// Maps JSON body deserialization failures onto the standard envelope instead
/// of actix's default plain-text 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let mut fields = HashMap::new();
        fields.insert("body".to_string(), err.to_string());
        AppError::Validation(fields).into()
    })
}
