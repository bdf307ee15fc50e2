mod client;
mod error;
mod message;
mod state;
mod synchronizer;

pub use client::FeedClient;
pub use error::FeedError;
pub use state::{ConnectionState, FeedStatus};
pub use synchronizer::{SyncSettings, Synchronizer, TopUpPolicy};
