use crate::app_config::{AppConfig, StoreKind};
use crate::context::TrackingContext;
use crate::domain::clock::SystemClock;
use crate::map::ConsoleMap;
use crate::notifier::LogNotifier;
use crate::publisher::LocationPublisher;
use crate::sensor::GpsdSensor;
use crate::store::{FirebaseStore, LocationStore, MemoryStore};
use crate::subscriber::LocationSubscriber;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

mod app_config;
mod context;
mod domain;
mod location_record_deserializer;
mod map;
mod notifier;
mod publisher;
mod sensor;
mod sse;
mod store;
mod subscriber;
mod subscription;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration");

    let store: Arc<dyn LocationStore> = match config.store().kind() {
        StoreKind::Firebase => Arc::new(FirebaseStore::new(store::new_client()?, config.store())),
        StoreKind::Memory => Arc::new(MemoryStore::default()),
    };
    info!(kind = ?config.store().kind(), "✅  Initialized store");

    match store.get(config.tracking().identity()).await {
        Ok(Some(record)) => info!(timestamp = record.timestamp, "📍 Last known location: {}", record.position()),
        Ok(None) => info!("📍 No location stored yet"),
        Err(e) => warn!("⚠️ Unable to read the last known location: {}", e),
    }

    let map = Arc::new(ConsoleMap::new(config.map().zoom()));
    let context = TrackingContext::init(config.tracking().identity().clone(), map.clone());

    let publisher = if config.publisher().enabled() {
        let sensor = Arc::new(GpsdSensor::new(config.sensor().gpsd_address()));
        let publisher = LocationPublisher::new(context.clone(), sensor, store.clone(), Arc::new(LogNotifier), Arc::new(SystemClock))
            .options(config.sensor().watch_options());

        match publisher.start().await {
            Ok(subscription) => {
                info!("✅  Started location publisher");
                Some(subscription)
            }
            Err(e) => {
                error!("❌ Location publisher not started: {}", e);
                None
            }
        }
    } else {
        None
    };

    let subscriber = config.subscriber().enabled().then(|| {
        let subscription = LocationSubscriber::new(context.clone(), store.clone(), config.subscriber().buffer_size()).start();
        info!("✅  Started location subscriber");
        subscription
    });

    map.initialize();
    info!("🔥 {} is up and running", env!("CARGO_PKG_NAME"));

    signal::ctrl_c().await?;
    info!("🛑 Shutting down...");

    for subscription in [publisher, subscriber].into_iter().flatten() {
        if !subscription.is_active() {
            warn!("⚠️ The {} had already stopped", subscription.name());
        }
        subscription.dispose();
    }
    context.teardown();

    info!("🛑 Shutting down... OK");
    Ok(())
}
