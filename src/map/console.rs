use crate::domain::LatLng;
use crate::map::{MapSurface, Marker};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info};

/// A headless map surface that logs every viewport and marker change.
#[derive(Debug)]
pub struct ConsoleMap {
    zoom: u8,
    center: Mutex<LatLng>,
    ready_tx: watch::Sender<bool>,
}

impl ConsoleMap {
    pub fn new(zoom: u8) -> Self {
        let (ready_tx, _) = watch::channel(false);

        ConsoleMap {
            zoom,
            center: Mutex::new(LatLng::default()),
            ready_tx,
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Marks the surface as ready, releasing everyone waiting in `ready`.
    pub fn initialize(&self) {
        self.ready_tx.send_replace(true);
        info!(zoom = self.zoom(), "🗺️ Map initialized, centered at {}", self.center());
    }
}

#[async_trait]
impl MapSurface for ConsoleMap {
    async fn ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        // The sender lives as long as the map, so this only returns once ready
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn center(&self) -> LatLng {
        *self.center.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_center(&self, position: LatLng) {
        *self.center.lock().unwrap_or_else(PoisonError::into_inner) = position;
        debug!("🗺️ Centered map at {}", position);
    }

    fn add_marker(&self, position: LatLng) -> Arc<dyn Marker> {
        debug!("🗺️ Added marker at {}", position);
        Arc::new(ConsoleMarker {
            position: Mutex::new(Some(position)),
        })
    }
}

#[derive(Debug)]
pub struct ConsoleMarker {
    position: Mutex<Option<LatLng>>,
}

impl Marker for ConsoleMarker {
    fn position(&self) -> Option<LatLng> {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_position(&self, position: LatLng) {
        let mut guard = self.position.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            debug!("🗺️ Ignoring position {} for a removed marker", position);
            return;
        }

        *guard = Some(position);
        debug!("🗺️ Moved marker to {}", position);
    }

    fn remove(&self) {
        self.position.lock().unwrap_or_else(PoisonError::into_inner).take();
        debug!("🗺️ Removed marker");
    }
}
