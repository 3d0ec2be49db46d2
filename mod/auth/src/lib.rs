pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;
use labqc_core::Module;

use service::AuthService;

/// Auth module — users, roles, the permission matrix, and sessions.
pub struct AuthModule {
    service: Arc<AuthService>,
}

impl AuthModule {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> Arc<AuthService> {
        self.service.clone()
    }
}

impl Module for AuthModule {
    fn name(&self) -> &str {
        "auth"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}
