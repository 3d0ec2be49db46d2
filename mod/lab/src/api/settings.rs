use std::collections::BTreeMap;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Deserialize;

use labqc_auth::model::{Action, CurrentUser, Page};
use labqc_core::ServiceError;

use super::{AppState, ok_json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/settings", get(list_settings))
        .route(
            "/settings/{key}",
            get(get_setting).put(put_setting).delete(delete_setting),
        )
}

async fn list_settings(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<BTreeMap<String, String>>, ServiceError> {
    current.require(Page::Settings, Action::View)?;
    ok_json(svc.list_settings())
}

async fn get_setting(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(key): Path<String>,
) -> Result<Json<Option<String>>, ServiceError> {
    current.require(Page::Settings, Action::View)?;
    ok_json(svc.get_setting(&key))
}

#[derive(Deserialize)]
struct SettingBody {
    value: String,
}

async fn put_setting(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(key): Path<String>,
    Json(body): Json<SettingBody>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    current.require(Page::Settings, Action::Edit)?;
    svc.put_setting(&key, &body.value).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn delete_setting(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    current.require(Page::Settings, Action::Edit)?;
    svc.delete_setting(&key).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
