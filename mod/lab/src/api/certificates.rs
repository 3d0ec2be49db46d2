use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;

use labqc_auth::model::{Action, CurrentUser, Page};
use labqc_core::{ListParams, ListResult, ServiceError};

use crate::model::{Certificate, CertificateStatus};
use super::{AppState, ok_json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/certificates", get(list_certificates).post(generate))
        .route("/certificates/{id}", get(get_certificate).delete(delete_certificate))
        .route("/certificates/{id}/submit", post(submit))
        .route("/certificates/{id}/approve", post(approve))
        .route("/certificates/{id}/reject", post(reject))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    batch_id: String,
}

async fn generate(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<Certificate>, ServiceError> {
    current.require(Page::Certificates, Action::Create)?;
    ok_json(svc.generate_certificate(&body.batch_id, &current.name))
}

#[derive(Deserialize)]
struct StatusFilter {
    #[serde(default)]
    status: Option<CertificateStatus>,
}

async fn list_certificates(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(filter): Query<StatusFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<Certificate>>, ServiceError> {
    current.require(Page::Certificates, Action::View)?;
    ok_json(svc.list_certificates(filter.status, &params))
}

async fn get_certificate(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, ServiceError> {
    current.require(Page::Certificates, Action::View)?;
    ok_json(svc.get_certificate(&id))
}

async fn submit(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, ServiceError> {
    current.require(Page::Certificates, Action::Edit)?;
    ok_json(svc.submit_certificate(&id))
}

async fn approve(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, ServiceError> {
    current.require(Page::Certificates, Action::Approve)?;
    ok_json(svc.approve_certificate(&id, &current.name))
}

#[derive(Deserialize)]
struct RejectBody {
    reason: String,
}

async fn reject(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> Result<Json<Certificate>, ServiceError> {
    current.require(Page::Certificates, Action::Approve)?;
    ok_json(svc.reject_certificate(&id, &body.reason))
}

async fn delete_certificate(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    current.require(Page::Certificates, Action::Delete)?;
    svc.delete_certificate(&id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
