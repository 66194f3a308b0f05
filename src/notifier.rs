use std::fmt::Debug;
use tracing::error;

/// Surfaces a notice to whoever operates the tracker.
pub trait OperatorNotifier: Debug + Send + Sync {
    fn alert(&self, message: &str);
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl OperatorNotifier for LogNotifier {
    fn alert(&self, message: &str) {
        error!(alert = true, "🚨 {}", message);
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl OperatorNotifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}
