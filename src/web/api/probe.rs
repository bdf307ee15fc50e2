use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::classify::zone_hit;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProbeRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProbeResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub unauthorized: bool,
    pub reason: String,
}

/// Classify an ad-hoc point against the current zone set.
#[utoipa::path(
    post,
    path = "/api/probe",
    request_body = ProbeRequest,
    responses(
        (status = 200, description = "Classification for the probed point", body = ProbeResponse),
        (status = 400, description = "Out-of-range coordinates", body = ErrorResponse)
    ),
    tag = "probe"
)]
pub async fn probe(
    State(state): State<AppState>,
    Json(request): Json<ProbeRequest>,
) -> ApiResult<Json<ProbeResponse>> {
    if !request.latitude.is_finite() || !(-90.0..=90.0).contains(&request.latitude) {
        return Err(ApiError::Validation(format!(
            "latitude {} out of range",
            request.latitude
        )));
    }
    if !request.longitude.is_finite() || !(-180.0..=180.0).contains(&request.longitude) {
        return Err(ApiError::Validation(format!(
            "longitude {} out of range",
            request.longitude
        )));
    }

    let zones = state.sync.lock().await.zones();
    let hit = zone_hit(request.latitude, request.longitude, &zones);
    Ok(Json(ProbeResponse {
        latitude: request.latitude,
        longitude: request.longitude,
        unauthorized: hit.is_some(),
        reason: hit
            .map(|z| format!("Restricted Zone: {}", z.name))
            .unwrap_or_default(),
    }))
}
