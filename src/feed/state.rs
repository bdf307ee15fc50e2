use chrono::{DateTime, Utc};
use serde::Serialize;

/// Connection lifecycle of the push channel. Transitions:
/// Disconnected -> Connecting -> Connected -> ReconnectWait -> Connecting ...
/// There is no backoff growth and no retry cap; the synchronizer retries for
/// the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectWait,
}

/// Point-in-time view of the synchronizer for the status endpoint.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct FeedStatus {
    pub state: ConnectionState,
    pub snapshot_version: u64,
    pub last_updated: DateTime<Utc>,
}
