use crate::classify::geo::distance_km;
use crate::model::{AuthorizationStatus, RestrictedZone, TelemetryRecord};

/// Find the first zone containing the given point, in zone-list order.
/// First match wins; the tie-break is arbitrary but deterministic and must
/// stay stable for reproducibility.
pub fn zone_hit<'a>(
    latitude: f64,
    longitude: f64,
    zones: &'a [RestrictedZone],
) -> Option<&'a RestrictedZone> {
    zones
        .iter()
        .find(|z| distance_km(latitude, longitude, z.latitude, z.longitude) <= z.radius_km)
}

/// Annotate a record against the zone set. A zone match marks the record
/// unauthorized with the zone named in the reason; no match leaves the prior
/// authorization state untouched, so a forced-synthetic flag is never cleared.
pub fn classify_record(mut record: TelemetryRecord, zones: &[RestrictedZone]) -> TelemetryRecord {
    if let Some(zone) = zone_hit(record.latitude, record.longitude, zones) {
        record.status = AuthorizationStatus::Unauthorized;
        record.reason = format!("Restricted Zone: {}", zone.name);
    }
    record
}

/// Classify a whole batch. Idempotent for a fixed zone set.
pub fn classify_batch(
    records: Vec<TelemetryRecord>,
    zones: &[RestrictedZone],
) -> Vec<TelemetryRecord> {
    records
        .into_iter()
        .map(|r| classify_record(r, zones))
        .collect()
}
