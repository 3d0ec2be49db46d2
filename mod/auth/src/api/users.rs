use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::Deserialize;

use labqc_core::{ListParams, ListResult, ServiceError};

use crate::model::{Action, CreateUser, CurrentUser, Page, PermissionRecord, User};
use super::{AppState, ok_json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/{id}/permissions", put(set_permissions))
        .route("/users/{id}/password", put(set_password))
}

async fn create_user(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateUser>,
) -> Result<Json<User>, ServiceError> {
    current.require(Page::Users, Action::Create)?;
    ok_json(svc.create_user(body))
}

async fn get_user(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<User>, ServiceError> {
    current.require(Page::Users, Action::View)?;
    ok_json(svc.get_user(&id))
}

async fn list_users(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<User>>, ServiceError> {
    current.require(Page::Users, Action::View)?;
    ok_json(svc.list_users(&params))
}

async fn update_user(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<User>, ServiceError> {
    current.require(Page::Users, Action::Edit)?;
    ok_json(svc.update_user(&id, patch))
}

async fn delete_user(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    current.require(Page::Users, Action::Delete)?;
    svc.delete_user(&id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

#[derive(Deserialize)]
struct PermissionsBody {
    /// Full override record, or null to clear back to role defaults.
    permissions: Option<PermissionRecord>,
}

async fn set_permissions(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<PermissionsBody>,
) -> Result<Json<User>, ServiceError> {
    current.require(Page::Users, Action::Edit)?;
    ok_json(svc.set_user_permissions(&id, body.permissions))
}

#[derive(Deserialize)]
struct PasswordBody {
    password: String,
}

async fn set_password(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<PasswordBody>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    // Users may change their own password; otherwise edit on Users.
    if current.id != id {
        current.require(Page::Users, Action::Edit)?;
    }
    svc.set_password(&id, &body.password)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
