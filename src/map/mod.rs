mod console;

use crate::domain::LatLng;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

pub use console::ConsoleMap;

/// A rendering surface with a viewport that can be recentered.
#[async_trait]
pub trait MapSurface: Debug + Send + Sync {
    /// Resolves once the surface is initialized.
    async fn ready(&self);

    fn center(&self) -> LatLng;

    fn set_center(&self, position: LatLng);

    fn add_marker(&self, position: LatLng) -> Arc<dyn Marker>;
}

pub trait Marker: Debug + Send + Sync {
    /// `None` once the marker has been removed from the surface.
    fn position(&self) -> Option<LatLng>;

    fn set_position(&self, position: LatLng);

    fn remove(&self);
}
