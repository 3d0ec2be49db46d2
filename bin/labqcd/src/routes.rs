use std::sync::Arc;

use axum::{Json, Router, middleware, routing::get};
use tracing::info;

use labqc_auth::service::AuthService;
use labqc_core::Module;

use crate::middleware::require_auth;

pub fn build_router(modules: &[&dyn Module], auth: Arc<AuthService>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for module in modules {
        info!(module = module.name(), "mounting module");
        router = router.merge(module.routes());
    }

    router.layer(middleware::from_fn_with_state(auth, require_auth))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({"version": env!("CARGO_PKG_VERSION")}))
}
