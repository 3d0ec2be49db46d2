use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use labqc_auth::model::{Action, CurrentUser, Page};
use labqc_core::{ListParams, ListResult, ServiceError};

use crate::model::{CreateProduct, Product};
use super::{AppState, ok_json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
}

async fn create_product(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateProduct>,
) -> Result<Json<Product>, ServiceError> {
    current.require(Page::Products, Action::Create)?;
    ok_json(svc.create_product(body))
}

async fn get_product(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ServiceError> {
    current.require(Page::Products, Action::View)?;
    ok_json(svc.get_product(&id))
}

async fn list_products(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<Product>>, ServiceError> {
    current.require(Page::Products, Action::View)?;
    ok_json(svc.list_products(&params))
}

async fn update_product(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Product>, ServiceError> {
    current.require(Page::Products, Action::Edit)?;
    ok_json(svc.update_product(&id, patch))
}

async fn delete_product(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    current.require(Page::Products, Action::Delete)?;
    svc.delete_product(&id).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({"ok": true})))
}
