pub mod batches;
pub mod certificates;
pub mod products;
pub mod reports;
pub mod settings;

use std::sync::Arc;

use axum::{Json, Router};
use serde::Serialize;

use labqc_core::ServiceError;

use crate::service::{LabError, LabService};

/// Shared application state.
pub type AppState = Arc<LabService>;

/// Build the lab API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/lab/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(batches::routes())
        .merge(certificates::routes())
        .merge(products::routes())
        .merge(reports::routes())
        .merge(settings::routes())
}

/// Wrap a Result<T, LabError> into an API response.
pub(crate) fn ok_json<T: Serialize>(
    result: Result<T, LabError>,
) -> Result<Json<T>, ServiceError> {
    result.map(Json).map_err(ServiceError::from)
}
