mod firebase;
mod memory;

use crate::domain::{Identity, LocationRecord};
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;
use tokio::sync::mpsc::Sender;

pub use firebase::{FirebaseStore, new_client};
pub use memory::MemoryStore;

pub const LOCATIONS_PATH: &str = "locations";

/// Path of the record of `identity`, relative to the root of the store.
pub fn record_path(identity: &Identity) -> String {
    format!("{}/{}", LOCATIONS_PATH, identity.as_str())
}

/// A path-keyed store holding at most one location record per identity.
#[async_trait]
pub trait LocationStore: Debug + Send + Sync {
    /// Replaces the record of `identity`.
    async fn set(&self, identity: &Identity, record: &LocationRecord) -> Result<(), StoreError>;

    async fn get(&self, identity: &Identity) -> Result<Option<LocationRecord>, StoreError>;

    /// Sends the current record of `identity`, and again after every change, until the receiver goes away.
    async fn listen(&self, identity: &Identity, tx: Sender<Option<LocationRecord>>) -> Result<(), StoreError>;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("realtime stream error: {0}")]
    Stream(String),
}
