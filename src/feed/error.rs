use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("synchronizer already running")]
    AlreadyRunning,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Payload(String),
}
