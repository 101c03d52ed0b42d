use std::sync::Arc;

use crate::auth::token::JwtKeys;
use crate::config::Config;
use crate::services::{AuthService, ProjectService, TaskService};
use crate::store::Store;

/// Shared application state: the signing keys (used by the auth middleware)
/// and the three services, all over one store.
#[derive(Clone)]
pub struct AppState {
    pub keys: Arc<JwtKeys>,
    pub auth: AuthService,
    pub projects: ProjectService,
    pub tasks: TaskService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        let keys = Arc::new(JwtKeys::from_config(config));
        Self {
            keys: keys.clone(),
            auth: AuthService::new(store.clone(), keys, config.bcrypt_cost),
            projects: ProjectService::new(store.clone()),
            tasks: TaskService::new(store),
        }
    }
}
