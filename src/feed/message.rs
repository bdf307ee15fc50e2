use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::feed::error::FeedError;
use crate::model::{
    normalize_timestamp_ms, AuthorizationStatus, Provenance, TelemetryRecord,
};

/// Record shape as the upstream feed sends it. Authorization fields on the
/// wire are ignored; classification happens locally.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRecord {
    #[serde(alias = "callsign")]
    pub id: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, alias = "altitude_m")]
    pub altitude: Option<f64>,
    #[serde(default, alias = "velocity_kmh")]
    pub velocity: Option<f64>,
    #[serde(default, alias = "country")]
    pub country_of_origin: Option<String>,
    #[serde(default, alias = "timestamp_millis", alias = "last_contact")]
    pub timestamp: Option<f64>,
}

impl WireRecord {
    /// Convert to a domain record. Records without usable coordinates are
    /// rejected here rather than propagated as non-finite distances.
    pub fn into_record(self) -> Result<TelemetryRecord, String> {
        let latitude = self.latitude.ok_or("missing latitude")?;
        let longitude = self.longitude.ok_or("missing longitude")?;
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude {latitude} out of range"));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude {longitude} out of range"));
        }

        let timestamp_ms = match self.timestamp {
            Some(t) if t.is_finite() => normalize_timestamp_ms(t as i64),
            _ => Utc::now().timestamp_millis(),
        };

        Ok(TelemetryRecord {
            id: self.id,
            latitude,
            longitude,
            altitude_m: self.altitude.unwrap_or(0.0),
            velocity_kmh: self.velocity.unwrap_or(0.0),
            country_of_origin: self.country_of_origin,
            timestamp_ms,
            status: AuthorizationStatus::Authorized,
            reason: String::new(),
            provenance: Provenance::Live,
        })
    }
}

/// Convert a wire batch, dropping records the converter rejects.
pub fn convert_batch(batch: Vec<WireRecord>) -> Vec<TelemetryRecord> {
    batch
        .into_iter()
        .filter_map(|wire| {
            let id = wire.id.clone();
            match wire.into_record() {
                Ok(record) => Some(record),
                Err(reason) => {
                    log::warn!("dropping record {id}: {reason}");
                    None
                }
            }
        })
        .collect()
}

/// Decode a push-channel message. Accepted shapes are `{"drones": [...]}` and
/// a bare array of records (legacy); anything else is an error the caller
/// logs and discards.
pub fn decode_push(text: &str) -> Result<Vec<WireRecord>, FeedError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| FeedError::Payload(e.to_string()))?;

    let records = match value {
        Value::Object(ref map) => map
            .get("drones")
            .cloned()
            .ok_or_else(|| FeedError::Payload("object without a 'drones' key".to_string()))?,
        Value::Array(_) => value,
        _ => return Err(FeedError::Payload("expected an object or an array".to_string())),
    };

    serde_json::from_value(records).map_err(|e| FeedError::Payload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_batch_object() {
        let records = decode_push(r#"{"drones": [{"callsign": "D1", "latitude": 37.3, "longitude": -115.8, "altitude": 1000, "velocity": 80}]}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "D1");
    }

    #[test]
    fn decodes_legacy_bare_array() {
        let records =
            decode_push(r#"[{"id": "D1", "latitude": 37.3, "longitude": -115.8}]"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn extra_keys_alongside_drones_are_ignored() {
        let records = decode_push(
            r#"{"drones": [], "validation": {"total_drones": 0}}"#,
        )
        .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(decode_push("42").is_err());
        assert!(decode_push(r#""drones""#).is_err());
        assert!(decode_push(r#"{"flights": []}"#).is_err());
        assert!(decode_push("not json at all").is_err());
    }

    #[test]
    fn epoch_seconds_timestamp_is_normalized() {
        let wire: WireRecord = serde_json::from_str(
            r#"{"id": "D1", "latitude": 37.3, "longitude": -115.8, "timestamp": 1700000000}"#,
        )
        .unwrap();
        assert_eq!(wire.into_record().unwrap().timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn millis_timestamp_is_kept() {
        let wire: WireRecord = serde_json::from_str(
            r#"{"id": "D1", "latitude": 37.3, "longitude": -115.8, "timestamp": 1700000000000}"#,
        )
        .unwrap();
        assert_eq!(wire.into_record().unwrap().timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let wire: WireRecord =
            serde_json::from_str(r#"{"id": "D1", "latitude": 95.0, "longitude": -115.8}"#).unwrap();
        assert!(wire.into_record().is_err());

        let wire: WireRecord =
            serde_json::from_str(r#"{"id": "D1", "latitude": 37.3, "longitude": -200.0}"#).unwrap();
        assert!(wire.into_record().is_err());
    }

    #[test]
    fn missing_coordinates_drop_only_that_record() {
        let batch = decode_push(
            r#"{"drones": [{"id": "D1", "latitude": 37.3, "longitude": -115.8}, {"id": "D2"}]}"#,
        )
        .unwrap();
        let converted = convert_batch(batch);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].id, "D1");
    }

    #[test]
    fn wire_records_arrive_unclassified() {
        let wire: WireRecord = serde_json::from_str(
            r#"{"id": "D1", "latitude": 37.3, "longitude": -115.8, "unauthorized": true}"#,
        )
        .unwrap();
        let record = wire.into_record().unwrap();
        assert_eq!(record.status, AuthorizationStatus::Authorized);
        assert_eq!(record.provenance, Provenance::Live);
    }
}
