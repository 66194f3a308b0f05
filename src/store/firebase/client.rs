use crate::app_config::Store;
use crate::domain::{Identity, LocationRecord};
use crate::store::firebase::listen::{ListenConfig, listen};
use crate::store::{LocationStore, StoreError, record_path};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc::Sender;
use tracing::{debug, instrument};

pub fn new_client() -> Result<Client, StoreError> {
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// A location store on top of the REST API of a Firebase Realtime Database.
#[derive(Debug)]
pub struct FirebaseStore {
    client: Client,
    url: String,
    listen_config: ListenConfig,
}

impl FirebaseStore {
    pub fn new(client: Client, config: &Store) -> Self {
        FirebaseStore {
            client,
            url: config.url().trim_end_matches('/').to_string(),
            listen_config: ListenConfig {
                retry: config.retry(),
                retry_max_delay: config.retry_max_delay(),
                stale_connection_timeout: config.stale_connection_timeout(),
            },
        }
    }

    fn record_url(&self, identity: &Identity) -> String {
        format!("{}/{}.json", self.url, record_path(identity))
    }
}

#[async_trait]
impl LocationStore for FirebaseStore {
    #[instrument(skip(self, record), fields(identity = %identity))]
    async fn set(&self, identity: &Identity, record: &LocationRecord) -> Result<(), StoreError> {
        self.client.put(self.record_url(identity)).json(record).send().await?.error_for_status()?;
        debug!("🔵 Stored {:?}", record);
        Ok(())
    }

    #[instrument(skip(self), fields(identity = %identity))]
    async fn get(&self, identity: &Identity) -> Result<Option<LocationRecord>, StoreError> {
        let response = self.client.get(self.record_url(identity)).send().await?.error_for_status()?;
        let value = response.json::<Value>().await?;
        Ok(LocationRecord::from_value(value)?)
    }

    async fn listen(&self, identity: &Identity, tx: Sender<Option<LocationRecord>>) -> Result<(), StoreError> {
        listen(&self.client, &self.record_url(identity), tx, &self.listen_config).await
    }
}
