use tokio::task::JoinHandle;
use tracing::info;

/// Owns the task behind a running watch or listener.
///
/// Disposing the subscription, or dropping it, aborts the task.
#[derive(Debug)]
pub struct Subscription {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(name: &'static str, handle: JoinHandle<()>) -> Self {
        Subscription { name, handle: Some(handle) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn dispose(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("🛑 Disposed {}", self.name());
        }
    }

    /// Waits for the task to end on its own.
    #[cfg(test)]
    pub async fn finished(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
