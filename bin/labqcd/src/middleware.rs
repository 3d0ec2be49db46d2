use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use labqc_auth::model::CurrentUser;
use labqc_auth::service::AuthService;
use labqc_core::ServiceError;

/// Paths reachable without a token.
const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/version",
    "/auth/v1/login",
    "/auth/v1/token/refresh",
];

/// Resolve the Bearer token into a [`CurrentUser`] request extension.
///
/// Handlers get the caller's effective permission matrix and station
/// access without touching the auth service themselves.
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".into()))?;

    let claims = auth.verify_token(token).map_err(ServiceError::from)?;
    let user = auth.get_user(&claims.sub).map_err(ServiceError::from)?;
    if !user.active {
        return Err(ServiceError::Unauthorized("account is disabled".into()));
    }

    req.extensions_mut().insert(CurrentUser::from_user(&user));
    Ok(next.run(req).await)
}
