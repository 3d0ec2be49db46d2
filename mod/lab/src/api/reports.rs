use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    routing::get,
};

use labqc_auth::model::{Action, CurrentUser, Page};
use labqc_core::ServiceError;

use crate::service::report::{BatchStatistics, StatsQuery};
use super::{AppState, ok_json};

pub fn routes() -> Router<AppState> {
    Router::new().route("/reports/batch-statistics", get(batch_statistics))
}

async fn batch_statistics(
    State(svc): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<BatchStatistics>, ServiceError> {
    current.require(Page::Analytics, Action::View)?;
    ok_json(svc.batch_statistics(&query))
}
