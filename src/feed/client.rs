use std::time::Duration;

use serde::Deserialize;

use crate::feed::error::FeedError;
use crate::feed::message::WireRecord;
use crate::model::RestrictedZone;

#[derive(Debug, Default, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    drones: Vec<WireRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct ZonesResponse {
    #[serde(default)]
    restricted_zones: Vec<RestrictedZone>,
}

/// HTTP side of the upstream feed: the snapshot-fetch and zones endpoints.
pub struct FeedClient {
    http: reqwest::Client,
}

impl FeedClient {
    pub fn new(timeout: Duration) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Full record fetch. A response without a `drones` key is an empty
    /// list, not an error.
    pub async fn fetch_records(&self, url: &str) -> Result<Vec<WireRecord>, FeedError> {
        let body: RecordsResponse = self.get_json(url).await?;
        Ok(body.drones)
    }

    /// Zone-set fetch. A response without a `restricted_zones` key is an
    /// empty set. Zones with a non-positive radius or unusable coordinates
    /// are dropped here so the classifier only ever sees valid geometry.
    pub async fn fetch_zones(&self, url: &str) -> Result<Vec<RestrictedZone>, FeedError> {
        let body: ZonesResponse = self.get_json(url).await?;
        Ok(sanitize_zones(body.restricted_zones))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| FeedError::Payload(e.to_string()))
    }
}

pub fn sanitize_zones(zones: Vec<RestrictedZone>) -> Vec<RestrictedZone> {
    zones
        .into_iter()
        .filter(|z| {
            let valid = z.radius_km > 0.0
                && z.radius_km.is_finite()
                && (-90.0..=90.0).contains(&z.latitude)
                && (-180.0..=180.0).contains(&z.longitude);
            if !valid {
                log::warn!("dropping invalid zone {:?}", z.name);
            }
            valid
        })
        .collect()
}
