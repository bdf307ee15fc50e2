use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound timestamps below this are epoch seconds, not millis.
pub const EPOCH_SECONDS_THRESHOLD: i64 = 10_000_000_000;

/// Where a record came from. Synthetic records are fillers, never
/// source-of-truth telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Live,
    Synthetic,
}

/// Three-state authorization. `Unknown` is reserved for records whose
/// authorization cannot be determined (none are produced today).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Authorized,
    Unauthorized,
    Unknown,
}

/// One observed vehicle state.
///
/// Invariant: `reason` is non-empty iff `status == Unauthorized`.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct TelemetryRecord {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub velocity_kmh: f64,
    pub country_of_origin: Option<String>,
    pub timestamp_ms: i64,
    pub status: AuthorizationStatus,
    pub reason: String,
    pub provenance: Provenance,
}

impl TelemetryRecord {
    pub fn is_unauthorized(&self) -> bool {
        self.status == AuthorizationStatus::Unauthorized
    }
}

/// Circular geofence. Radius is strictly positive; enforced at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RestrictedZone {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(alias = "radius")]
    pub radius_km: f64,
}

/// The published state: a complete, internally consistent view of records and
/// zones. Replaced wholesale on every publish, never mutated in place.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Snapshot {
    pub records: Vec<TelemetryRecord>,
    pub zones: Vec<RestrictedZone>,
    pub last_updated: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            zones: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn unauthorized_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_unauthorized()).count()
    }
}

/// Normalize an inbound epoch timestamp to millis. Values below the
/// threshold are treated as epoch seconds.
pub fn normalize_timestamp_ms(value: i64) -> i64 {
    if value < EPOCH_SECONDS_THRESHOLD {
        value * 1000
    } else {
        value
    }
}
