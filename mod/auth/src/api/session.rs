use axum::{
    Extension, Json, Router,
    extract::State,
    routing::post,
};
use serde::{Deserialize, Serialize};

use labqc_core::ServiceError;

use crate::model::{CurrentUser, Page, PermissionMatrix, TokenPair};
use super::{AppState, ok_json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/token/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", axum::routing::get(me))
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(flatten)]
    tokens: TokenPair,
    /// First page the client should route to, per the resolved matrix.
    landing_page: Option<Page>,
}

async fn login(
    State(svc): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let user = svc
        .authenticate(&body.username, &body.password)
        .map_err(ServiceError::from)?;
    let tokens = svc.issue_tokens(&user).map_err(ServiceError::from)?;
    let landing_page = user.effective_permissions().landing_page();
    Ok(Json(LoginResponse {
        tokens,
        landing_page,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: String,
}

async fn refresh(
    State(svc): State<AppState>,
    Json(body): Json<RefreshBody>,
) -> Result<Json<TokenPair>, ServiceError> {
    ok_json(svc.refresh_tokens(&body.refresh_token))
}

#[derive(Deserialize)]
struct LogoutBody {
    sid: String,
}

async fn logout(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<LogoutBody>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    // Users may only revoke their own sessions.
    let session: crate::model::Session = svc
        .get_record("sessions", &body.sid)
        .map_err(ServiceError::from)?;
    if session.user_id != current.id {
        return Err(ServiceError::PermissionDenied(
            "cannot revoke another user's session".into(),
        ));
    }
    svc.revoke_session(&body.sid).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    user: crate::model::User,
    permissions: PermissionMatrix,
    landing_page: Option<Page>,
}

async fn me(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<MeResponse>, ServiceError> {
    let user = svc.get_user(&current.id).map_err(ServiceError::from)?;
    let permissions = user.effective_permissions();
    let landing_page = permissions.landing_page();
    Ok(Json(MeResponse {
        user,
        permissions,
        landing_page,
    }))
}
