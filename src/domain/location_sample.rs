use crate::domain::LatLng;
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocationSample {
    pub position: LatLng,
    /// Estimated horizontal error in meters, if the sensor reports one
    pub accuracy: Option<f64>,
}

impl LocationSample {
    pub fn new(position: LatLng, accuracy: Option<f64>) -> Self {
        LocationSample { position, accuracy }
    }
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum SampleError {
    #[error("permission to access the location was denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("no position acquired within {0:?}")]
    Timeout(Duration),
}

impl SampleError {
    /// Text shown to the operator when this error occurs.
    pub fn notice(&self) -> &'static str {
        match self {
            SampleError::PermissionDenied => "Location access denied. Please enable GPS.",
            SampleError::PositionUnavailable(_) => "Location unavailable. Please check the GPS receiver.",
            SampleError::Timeout(_) => "Location request timed out. Please check the GPS receiver.",
        }
    }
}

pub type SampleResult = Result<LocationSample, SampleError>;
