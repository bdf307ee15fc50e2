use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{AuthorizationStatus, Snapshot};
use crate::synth::SIMULATED_REASON;

const ZONE_REASON_PREFIX: &str = "Restricted Zone: ";

/// Summary counts with a self-consistency check: the three buckets must
/// account for every record in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ValidationResult {
    pub total_drones: usize,
    pub authorized: usize,
    pub unauthorized: usize,
    pub unknown: usize,
    pub validation_passed: bool,
}

pub fn validate(snapshot: &Snapshot) -> ValidationResult {
    let mut authorized = 0;
    let mut unauthorized = 0;
    let mut unknown = 0;
    for record in &snapshot.records {
        match record.status {
            AuthorizationStatus::Authorized => authorized += 1,
            AuthorizationStatus::Unauthorized => unauthorized += 1,
            AuthorizationStatus::Unknown => unknown += 1,
        }
    }
    let total_drones = snapshot.records.len();
    ValidationResult {
        total_drones,
        authorized,
        unauthorized,
        unknown,
        validation_passed: authorized + unauthorized + unknown == total_drones,
    }
}

/// Derived metrics over the current record set. Zone-based and simulated
/// violations are reported separately; `unauthorized_drones` is their union.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct StatsSummary {
    pub total_drones: usize,
    pub unauthorized_drones: usize,
    pub avg_velocity_kmh: f64,
    pub avg_altitude_m: f64,
    pub restricted_zone_violations: usize,
    pub simulated_violations: usize,
    pub last_updated: DateTime<Utc>,
}

pub fn summarize(snapshot: &Snapshot) -> StatsSummary {
    let total = snapshot.records.len();
    let unauthorized = snapshot.unauthorized_count();
    let zone_violations = snapshot
        .records
        .iter()
        .filter(|r| r.is_unauthorized() && r.reason.starts_with(ZONE_REASON_PREFIX))
        .count();
    let simulated = snapshot
        .records
        .iter()
        .filter(|r| r.is_unauthorized() && r.reason == SIMULATED_REASON)
        .count();

    let (avg_velocity_kmh, avg_altitude_m) = if total == 0 {
        (0.0, 0.0)
    } else {
        let velocity: f64 = snapshot.records.iter().map(|r| r.velocity_kmh).sum();
        let altitude: f64 = snapshot.records.iter().map(|r| r.altitude_m).sum();
        (velocity / total as f64, altitude / total as f64)
    };

    StatsSummary {
        total_drones: total,
        unauthorized_drones: unauthorized,
        avg_velocity_kmh,
        avg_altitude_m,
        restricted_zone_violations: zone_violations,
        simulated_violations: simulated,
        last_updated: snapshot.last_updated,
    }
}
