mod gpsd;
mod gpsd_report;

use crate::domain::SampleResult;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::Receiver;

pub use gpsd::GpsdSensor;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WatchOptions {
    /// Only accept the most precise fixes the sensor can produce
    pub high_accuracy: bool,
    /// How old a previously acquired fix may be to be handed out at the start of a watch
    pub max_cached_age: Duration,
    /// Report a timeout when no fix arrives within this duration
    pub timeout: Option<Duration>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            high_accuracy: true,
            max_cached_age: Duration::ZERO,
            timeout: None,
        }
    }
}

#[async_trait]
pub trait LocationSensor: Debug + Send + Sync {
    /// Starts a continuous watch. The watch ends when the returned receiver is dropped.
    async fn watch(&self, options: WatchOptions) -> Result<Receiver<SampleResult>, SensorError>;
}

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("location capability unavailable: {0}")]
    CapabilityUnavailable(String),
}

/// Replays a fixed list of samples and then ends the watch.
#[cfg(test)]
#[derive(Debug)]
pub struct ScriptedSensor {
    samples: std::sync::Mutex<Option<Vec<SampleResult>>>,
    available: bool,
}

#[cfg(test)]
impl ScriptedSensor {
    pub fn new(samples: Vec<SampleResult>) -> Self {
        ScriptedSensor {
            samples: std::sync::Mutex::new(Some(samples)),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        ScriptedSensor {
            samples: std::sync::Mutex::new(None),
            available: false,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl LocationSensor for ScriptedSensor {
    async fn watch(&self, _options: WatchOptions) -> Result<Receiver<SampleResult>, SensorError> {
        if !self.available {
            return Err(SensorError::CapabilityUnavailable("scripted".to_string()));
        }

        let samples = self.samples.lock().unwrap().take().unwrap_or_default();
        let (tx, rx) = tokio::sync::mpsc::channel(samples.len().max(1));
        for sample in samples {
            tx.try_send(sample).expect("channel sized to fit all samples");
        }

        Ok(rx)
    }
}
