use axum::{extract::State, Json};

use crate::feed::FeedStatus;
use crate::model::Snapshot;
use crate::report::{self, StatsSummary, ValidationResult};
use crate::web::server::AppState;

#[utoipa::path(
    get,
    path = "/api/snapshot",
    responses(
        (status = 200, description = "Current published snapshot", body = Snapshot)
    ),
    tag = "feed"
)]
pub async fn snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    let sync = state.sync.lock().await;
    Json((*sync.snapshot()).clone())
}

#[utoipa::path(
    get,
    path = "/api/validation",
    responses(
        (status = 200, description = "Consistency check over the current snapshot", body = ValidationResult)
    ),
    tag = "feed"
)]
pub async fn validation(State(state): State<AppState>) -> Json<ValidationResult> {
    let sync = state.sync.lock().await;
    Json(report::validate(&sync.snapshot()))
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Derived metrics over the current snapshot", body = StatsSummary)
    ),
    tag = "feed"
)]
pub async fn stats(State(state): State<AppState>) -> Json<StatsSummary> {
    let sync = state.sync.lock().await;
    Json(report::summarize(&sync.snapshot()))
}

#[utoipa::path(
    get,
    path = "/api/feed/status",
    responses(
        (status = 200, description = "Connection state and snapshot version", body = FeedStatus)
    ),
    tag = "feed"
)]
pub async fn status(State(state): State<AppState>) -> Json<FeedStatus> {
    let sync = state.sync.lock().await;
    Json(sync.status())
}
