use crate::domain::LatLng;
use serde::Serialize;
use serde_json::Value;

/// The last known location of an identity. Stored as `{"lat": .., "lng": .., "timestamp": ..}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LocationRecord {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl LocationRecord {
    pub fn new(position: LatLng, timestamp: i64) -> Self {
        LocationRecord {
            latitude: position.latitude,
            longitude: position.longitude,
            timestamp,
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Decodes a stored value, `null` means there is no record.
    pub fn from_value(value: Value) -> Result<Option<LocationRecord>, serde_json::Error> {
        serde_json::from_value(value)
    }
}
