use crate::domain::{Identity, LatLng};
use crate::map::{MapSurface, Marker};
use std::sync::Arc;
use tracing::info;

/// Everything the publisher and the subscriber share: whose location is tracked and where it is drawn.
#[derive(Debug, Clone)]
pub struct TrackingContext {
    identity: Identity,
    map: Arc<dyn MapSurface>,
    marker: Arc<dyn Marker>,
}

impl TrackingContext {
    /// Places the marker for `identity` on the map, at the map's current center.
    pub fn init(identity: Identity, map: Arc<dyn MapSurface>) -> Self {
        let marker = map.add_marker(map.center());
        info!(identity = %identity, "✅  Initialized tracking context");

        TrackingContext { identity, map, marker }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn map(&self) -> &Arc<dyn MapSurface> {
        &self.map
    }

    pub fn marker(&self) -> &Arc<dyn Marker> {
        &self.marker
    }

    /// Moves the marker and the viewport to `position`.
    pub fn show(&self, position: LatLng) {
        self.marker.set_position(position);
        self.map.set_center(position);
    }

    pub fn teardown(self) {
        let last_position = self.marker.position();
        self.marker.remove();
        info!(identity = %self.identity, ?last_position, "🛑 Tore down tracking context");
    }
}
