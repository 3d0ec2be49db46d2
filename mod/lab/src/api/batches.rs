use std::collections::BTreeMap;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::Deserialize;

use labqc_auth::model::{Action, CurrentUser, Page};
use labqc_core::{ListParams, ListResult, ServiceError};

use crate::model::{MeasurementKey, TestBatch};
use crate::service::batch::{BatchFilter, PendingBatch, SubmitStation};
use super::{AppState, ok_json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/batches", get(list_batches))
        .route("/batches/submit", post(submit_station))
        .route("/batches/{id}", get(get_batch).delete(delete_batch))
        .route("/batches/{id}/measurements", axum::routing::patch(edit_measurements))
        .route("/batches/{id}/release", post(release_batch))
        .route("/batches/{id}/reference", put(set_reference_no))
        .route("/holds", get(list_holds))
        .route("/holds/history", get(hold_history))
        .route("/pending", get(pending_tests))
}

async fn submit_station(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<SubmitStation>,
) -> Result<Json<TestBatch>, ServiceError> {
    current.require(Page::TestEntry, Action::Create)?;
    current.require_station(body.station.as_str())?;
    ok_json(svc.submit_station(body, &current.name))
}

async fn list_batches(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(filter): Query<BatchFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<TestBatch>>, ServiceError> {
    current.require(Page::BatchSelection, Action::View)?;
    ok_json(svc.list_batches(&filter, &params))
}

async fn get_batch(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<TestBatch>, ServiceError> {
    current.require(Page::BatchSelection, Action::View)?;
    ok_json(svc.get_batch(&id))
}

async fn delete_batch(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    current.require(Page::BatchSelection, Action::Delete)?;
    svc.delete_batch(&id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

#[derive(Deserialize)]
struct EditBody {
    values: BTreeMap<MeasurementKey, String>,
}

async fn edit_measurements(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<EditBody>,
) -> Result<Json<TestBatch>, ServiceError> {
    current.require(Page::HoldManagement, Action::Edit)?;
    ok_json(svc.edit_measurements(&id, body.values, &current.name))
}

async fn release_batch(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<TestBatch>, ServiceError> {
    current.require(Page::HoldManagement, Action::Edit)?;
    ok_json(svc.release_batch(&id, &current.name))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceBody {
    reference_no: String,
}

async fn set_reference_no(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<ReferenceBody>,
) -> Result<Json<TestBatch>, ServiceError> {
    if !current.matrix.can_modify_reference_no {
        return Err(ServiceError::PermissionDenied(
            "not allowed to modify reference numbers".into(),
        ));
    }
    ok_json(svc.set_reference_no(&id, &body.reference_no, &current.name))
}

async fn list_holds(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<TestBatch>>, ServiceError> {
    current.require(Page::HoldManagement, Action::View)?;
    ok_json(svc.held_batches(&params))
}

async fn hold_history(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<TestBatch>>, ServiceError> {
    current.require(Page::HoldManagement, Action::View)?;
    ok_json(svc.hold_history(&params))
}

async fn pending_tests(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<PendingBatch>>, ServiceError> {
    current.require(Page::PendingTests, Action::View)?;
    ok_json(svc.pending_tests(&params))
}
