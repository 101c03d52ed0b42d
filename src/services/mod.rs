pub mod auth;
pub mod project;
pub mod task;

pub use auth::AuthService;
pub use project::ProjectService;
pub use task::{NewTask, TaskService};
