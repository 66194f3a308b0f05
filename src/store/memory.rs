use crate::domain::{Identity, LocationRecord};
use crate::store::{LocationStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc::Sender;
use tokio::sync::{RwLock, watch};
use tracing::{debug, instrument};

/// In-process store, every identity gets its own watch channel.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Identity, watch::Sender<Option<LocationRecord>>>>,
}

impl MemoryStore {
    async fn subscribe(&self, identity: &Identity) -> watch::Receiver<Option<LocationRecord>> {
        if let Some(sender) = self.records.read().await.get(identity) {
            return sender.subscribe();
        }

        let mut write_guard = self.records.write().await;
        write_guard.entry(identity.clone()).or_insert_with(|| watch::channel(None).0).subscribe()
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn set(&self, identity: &Identity, record: &LocationRecord) -> Result<(), StoreError> {
        let mut write_guard = self.records.write().await;
        let sender = write_guard.entry(identity.clone()).or_insert_with(|| watch::channel(None).0);
        let previous = sender.send_replace(Some(*record));

        debug!(identity = %identity, "🔵 Stored {:?}, was {:?}", record, previous);
        Ok(())
    }

    async fn get(&self, identity: &Identity) -> Result<Option<LocationRecord>, StoreError> {
        Ok(self.records.read().await.get(identity).and_then(|sender| *sender.borrow()))
    }

    #[instrument(skip(self, tx))]
    async fn listen(&self, identity: &Identity, tx: Sender<Option<LocationRecord>>) -> Result<(), StoreError> {
        let mut rx = self.subscribe(identity).await;

        loop {
            let record = *rx.borrow_and_update();
            if tx.send(record).await.is_err() {
                debug!("Listener went away, stop listening");
                return Ok(());
            }

            if rx.changed().await.is_err() {
                return Err(StoreError::Stream("store was dropped".to_string()));
            }
        }
    }
}
