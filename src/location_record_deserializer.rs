use crate::domain::LocationRecord;
use serde::de::Error;
use serde::{Deserialize, Deserializer};

impl<'de> Deserialize<'de> for LocationRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Debug, Deserialize)]
        pub struct Inner {
            lat: f64,
            lng: f64,
            timestamp: i64,
        }

        let inner = Inner::deserialize(deserializer)?;
        if !(inner.lat >= -90.0 && inner.lat <= 90.0) {
            return Err(Error::custom(format!("invalid record latitude: {}, must be between -90 and 90", inner.lat)));
        }

        if !(inner.lng >= -180.0 && inner.lng <= 180.0) {
            return Err(Error::custom(format!("invalid record longitude: {}, must be between -180 and 180", inner.lng)));
        }

        Ok(LocationRecord {
            latitude: inner.lat,
            longitude: inner.lng,
            timestamp: inner.timestamp,
        })
    }
}
