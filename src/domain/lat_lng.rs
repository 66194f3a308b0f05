use std::fmt::{Display, Formatter};

/// A position in degrees, as consumed by the map surface.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        LatLng { latitude, longitude }
    }
}

impl Display for LatLng {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}
