use crate::context::TrackingContext;
use crate::domain::clock::Clock;
use crate::domain::{Identity, LocationRecord, SampleResult};
use crate::notifier::OperatorNotifier;
use crate::sensor::{LocationSensor, SensorError, WatchOptions};
use crate::store::LocationStore;
use crate::subscription::Subscription;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::Receiver;
use tracing::{error, info, instrument, warn};

/// Watches the device's position and writes every fix to the store.
#[derive(Debug)]
pub struct LocationPublisher {
    context: TrackingContext,
    sensor: Arc<dyn LocationSensor>,
    store: Arc<dyn LocationStore>,
    notifier: Arc<dyn OperatorNotifier>,
    clock: Arc<dyn Clock>,
    options: WatchOptions,
}

impl LocationPublisher {
    pub fn new(
        context: TrackingContext,
        sensor: Arc<dyn LocationSensor>,
        store: Arc<dyn LocationStore>,
        notifier: Arc<dyn OperatorNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        LocationPublisher {
            context,
            sensor,
            store,
            notifier,
            clock,
            options: WatchOptions::default(),
        }
    }

    pub fn options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    #[instrument(skip_all, fields(identity = %self.context.identity()))]
    pub async fn start(self) -> Result<Subscription, PublisherError> {
        info!("📡 Starting location watch...");
        let rx = match self.sensor.watch(self.options).await {
            Ok(rx) => rx,
            Err(e) => {
                error!("❌ Geolocation is not supported: {}", e);
                return Err(e.into());
            }
        };
        info!(high_accuracy = self.options.high_accuracy, "📡 Starting location watch... OK");

        let identity = self.context.identity().clone();
        let handle = tokio::spawn(publish(identity, rx, self.store, self.notifier, self.clock));
        Ok(Subscription::new("location publisher", handle))
    }
}

#[instrument(skip_all, fields(identity = %identity))]
async fn publish(
    identity: Identity,
    mut rx: Receiver<SampleResult>,
    store: Arc<dyn LocationStore>,
    notifier: Arc<dyn OperatorNotifier>,
    clock: Arc<dyn Clock>,
) {
    let mut last_timestamp = i64::MIN;

    while let Some(result) = rx.recv().await {
        let sample = match result {
            Ok(sample) => sample,
            Err(e) => {
                error!("❌ Location error: {}", e);
                notifier.alert(e.notice());
                continue;
            }
        };

        // Wall clocks may jump back, stored timestamps may not
        let timestamp = clock.now_millis().max(last_timestamp);
        let record = LocationRecord::new(sample.position, timestamp);

        match store.set(&identity, &record).await {
            Ok(()) => {
                last_timestamp = timestamp;
                info!(timestamp, accuracy = ?sample.accuracy, "📍 Updated: {}", sample.position);
            }
            Err(e) => warn!("⚠️ Unable to store the location: {}", e),
        }
    }

    warn!("🔴 Location watch ended");
}

#[derive(Error, Debug)]
pub enum PublisherError {
    #[error(transparent)]
    LocationCapabilityUnavailable(#[from] SensorError),
}
