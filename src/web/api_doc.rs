use utoipa::OpenApi;

use crate::feed::{ConnectionState, FeedStatus};
use crate::model::{
    AuthorizationStatus, Provenance, RestrictedZone, Snapshot, TelemetryRecord,
};
use crate::report::{StatsSummary, ValidationResult};

use super::api::error::ErrorResponse;
use super::api::probe::{ProbeRequest, ProbeResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::feed::snapshot,
        super::api::feed::validation,
        super::api::feed::stats,
        super::api::feed::status,
        super::api::probe::probe,
    ),
    components(
        schemas(
            Snapshot,
            TelemetryRecord,
            RestrictedZone,
            AuthorizationStatus,
            Provenance,
            ValidationResult,
            StatsSummary,
            FeedStatus,
            ConnectionState,
            ProbeRequest,
            ProbeResponse,
            ErrorResponse,
        )
    ),
    info(
        title = "Drone Sentry API",
        description = "Live airspace telemetry, restricted-zone classification and aggregate statistics",
        version = "0.1.0"
    ),
    tags(
        (name = "feed", description = "Snapshot, validation and stats"),
        (name = "probe", description = "Ad-hoc point classification")
    )
)]
pub struct ApiDoc;
