use rand::Rng;
use serde::Deserialize;

use crate::model::{AuthorizationStatus, Provenance, TelemetryRecord};

/// Reason attached to every synthetic record that is marked unauthorized.
pub const SIMULATED_REASON: &str = "Simulated: Restricted Zone";

/// Per-record chance that an unforced synthetic record is unauthorized.
const UNAUTHORIZED_PROBABILITY: f64 = 0.4;

/// Value bands the generator draws from, continental-US defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthBands {
    #[serde(default = "default_latitude")]
    pub latitude: [f64; 2],
    #[serde(default = "default_longitude")]
    pub longitude: [f64; 2],
    #[serde(default = "default_altitude_m")]
    pub altitude_m: [f64; 2],
    #[serde(default = "default_velocity_kmh")]
    pub velocity_kmh: [f64; 2],
}

fn default_latitude() -> [f64; 2] {
    [25.0, 49.0]
}

fn default_longitude() -> [f64; 2] {
    [-125.0, -67.0]
}

fn default_altitude_m() -> [f64; 2] {
    [100.0, 3000.0]
}

fn default_velocity_kmh() -> [f64; 2] {
    [30.0, 200.0]
}

impl Default for SynthBands {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            altitude_m: default_altitude_m(),
            velocity_kmh: default_velocity_kmh(),
        }
    }
}

impl SynthBands {
    /// Bands must be non-empty intervals inside valid coordinate space.
    pub fn validate(&self) -> Result<(), String> {
        let check = |name: &str, band: [f64; 2]| {
            if band[0] > band[1] {
                Err(format!("{name} band is inverted: [{}, {}]", band[0], band[1]))
            } else {
                Ok(())
            }
        };
        check("latitude", self.latitude)?;
        check("longitude", self.longitude)?;
        check("altitude_m", self.altitude_m)?;
        check("velocity_kmh", self.velocity_kmh)?;
        if self.latitude[0] < -90.0 || self.latitude[1] > 90.0 {
            return Err("latitude band outside [-90, 90]".to_string());
        }
        if self.longitude[0] < -180.0 || self.longitude[1] > 180.0 {
            return Err("longitude band outside [-180, 180]".to_string());
        }
        Ok(())
    }
}

/// Randomized producer of filler telemetry. Output is never source-of-truth
/// data; every record is tagged `Provenance::Synthetic`.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    bands: SynthBands,
}

impl SyntheticGenerator {
    pub fn new(bands: SynthBands) -> Self {
        Self { bands }
    }

    /// Produce `count` records. With `force_unauthorized` every record is
    /// unauthorized with the simulated reason; otherwise each record is
    /// independently unauthorized with probability 0.4.
    pub fn generate(&self, count: usize, force_unauthorized: bool) -> Vec<TelemetryRecord> {
        let mut rng = rand::thread_rng();
        let now_ms = chrono::Utc::now().timestamp_millis();

        (0..count)
            .map(|i| {
                let unauthorized = force_unauthorized || rng.gen_bool(UNAUTHORIZED_PROBABILITY);
                TelemetryRecord {
                    id: format!("SIM-{}", i + 1),
                    latitude: range_sample(&mut rng, self.bands.latitude),
                    longitude: range_sample(&mut rng, self.bands.longitude),
                    altitude_m: range_sample(&mut rng, self.bands.altitude_m),
                    velocity_kmh: range_sample(&mut rng, self.bands.velocity_kmh),
                    country_of_origin: None,
                    timestamp_ms: now_ms,
                    status: if unauthorized {
                        AuthorizationStatus::Unauthorized
                    } else {
                        AuthorizationStatus::Authorized
                    },
                    reason: if unauthorized {
                        SIMULATED_REASON.to_string()
                    } else {
                        String::new()
                    },
                    provenance: Provenance::Synthetic,
                }
            })
            .collect()
    }
}

fn range_sample(rng: &mut impl Rng, band: [f64; 2]) -> f64 {
    if band[0] == band[1] {
        band[0]
    } else {
        rng.gen_range(band[0]..band[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_count_with_sim_ids() {
        let records = SyntheticGenerator::new(SynthBands::default()).generate(7, false);
        assert_eq!(records.len(), 7);
        assert_eq!(records[0].id, "SIM-1");
        assert_eq!(records[6].id, "SIM-7");
        assert!(records.iter().all(|r| r.provenance == Provenance::Synthetic));
    }

    #[test]
    fn values_stay_inside_bands() {
        let bands = SynthBands::default();
        for r in SyntheticGenerator::new(bands.clone()).generate(50, false) {
            assert!(r.latitude >= bands.latitude[0] && r.latitude <= bands.latitude[1]);
            assert!(r.longitude >= bands.longitude[0] && r.longitude <= bands.longitude[1]);
            assert!(r.altitude_m >= bands.altitude_m[0] && r.altitude_m <= bands.altitude_m[1]);
            assert!(r.velocity_kmh >= bands.velocity_kmh[0] && r.velocity_kmh <= bands.velocity_kmh[1]);
        }
    }

    #[test]
    fn forced_records_are_all_unauthorized_with_simulated_reason() {
        for r in SyntheticGenerator::new(SynthBands::default()).generate(5, true) {
            assert_eq!(r.status, AuthorizationStatus::Unauthorized);
            assert_eq!(r.reason, SIMULATED_REASON);
        }
    }

    #[test]
    fn reason_is_nonempty_iff_unauthorized() {
        for r in SyntheticGenerator::new(SynthBands::default()).generate(100, false) {
            assert_eq!(
                r.status == AuthorizationStatus::Unauthorized,
                !r.reason.is_empty()
            );
        }
    }

    #[test]
    fn band_validation_rejects_inverted_and_out_of_range() {
        let mut bands = SynthBands::default();
        bands.latitude = [49.0, 25.0];
        assert!(bands.validate().is_err());

        let mut bands = SynthBands::default();
        bands.longitude = [-190.0, -67.0];
        assert!(bands.validate().is_err());

        assert!(SynthBands::default().validate().is_ok());
    }
}
