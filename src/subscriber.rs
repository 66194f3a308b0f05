use crate::context::TrackingContext;
use crate::domain::{LatLng, LocationRecord};
use crate::store::LocationStore;
use crate::subscription::Subscription;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, Receiver};
use tracing::{error, info, instrument, warn};

/// Follows the stored location of the tracked identity and shows it on the map.
#[derive(Debug)]
pub struct LocationSubscriber {
    context: TrackingContext,
    store: Arc<dyn LocationStore>,
    buffer_size: usize,
}

impl LocationSubscriber {
    pub fn new(context: TrackingContext, store: Arc<dyn LocationStore>, buffer_size: usize) -> Self {
        LocationSubscriber {
            context,
            store,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Starts listening as soon as the map surface is ready.
    pub fn start(self) -> Subscription {
        Subscription::new("location subscriber", tokio::spawn(self.follow()))
    }

    #[instrument(skip_all, fields(identity = %self.context.identity()))]
    async fn follow(self) {
        info!("🗺️ Waiting for the map...");
        self.context.map().ready().await;
        info!("🗺️ Waiting for the map... OK");

        let (tx, rx) = mpsc::channel(self.buffer_size);
        let (listened, ()) = tokio::join!(self.store.listen(self.context.identity(), tx), render_changes(&self.context, rx));

        match listened {
            Ok(()) => warn!("🔴 Stopped listening for location changes"),
            Err(e) => error!("❌ Listening for location changes failed: {}", e),
        }
    }
}

async fn render_changes(context: &TrackingContext, mut rx: Receiver<Option<LocationRecord>>) {
    while let Some(record) = rx.recv().await {
        if let Err(e) = render(context, record) {
            warn!("⚠️ {}", e);
        }
    }
}

/// Moves the marker and the viewport to the stored position, an absent record leaves the map untouched.
pub fn render(context: &TrackingContext, record: Option<LocationRecord>) -> Result<LatLng, RenderError> {
    let record = record.ok_or(RenderError::NoRecordAvailable)?;
    let position = record.position();

    context.show(position);
    info!(timestamp = record.timestamp, "📍 Map updated: {}", position);
    Ok(position)
}

#[derive(Error, Debug, PartialEq)]
pub enum RenderError {
    #[error("no location data available")]
    NoRecordAvailable,
}
