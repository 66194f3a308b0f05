use crate::domain::LocationRecord;
use crate::sse::{FrameBuffer, ServerSentEvent};
use crate::store::StoreError;
use crate::store::firebase::stream_event::StreamEvent;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, instrument, trace, warn};

#[derive(Debug)]
pub struct ListenConfig {
    pub retry: Duration,
    pub retry_max_delay: Duration,
    pub stale_connection_timeout: Duration,
}

/// Streams the record at `url`, reconnecting with backoff until the receiving end of `tx` is dropped.
#[instrument(skip(client, tx, config))]
pub async fn listen(client: &Client, url: &str, tx: Sender<Option<LocationRecord>>, config: &ListenConfig) -> Result<(), StoreError> {
    let strategy = reconnect_delays(config).map(jitter);

    let tx = &tx;
    info!("Connecting to realtime stream {}...", url);
    Retry::spawn(strategy, move || async move {
        match connect_stream(client, url, tx, config.stale_connection_timeout).await {
            Ok(()) => {
                info!("✅ Listener went away, closing realtime stream");
                Ok(())
            }
            Err(e) => {
                warn!("⚠️ Realtime stream error: {}. Reconnecting...", e);
                Err(e)
            }
        }
    })
    .await
}

/// Doubles the configured retry delay after every failed attempt, up to the maximum delay.
fn reconnect_delays(config: &ListenConfig) -> ExponentialBackoff {
    ExponentialBackoff::from_millis(2)
        .factor(config.retry.as_millis() as u64)
        .max_delay(config.retry_max_delay)
}

/// Returns `Ok` only when nobody listens anymore, every other way the stream ends is an error.
async fn connect_stream(client: &Client, url: &str, tx: &Sender<Option<LocationRecord>>, stale_connection_timeout: Duration) -> Result<(), StoreError> {
    let response = client.get(url).header(ACCEPT, "text/event-stream").send().await?.error_for_status()?;

    if response.status() == StatusCode::OK {
        info!(status = %response.status(), "Connecting to realtime stream {}... OK", url);
    }

    let mut stream = response.bytes_stream();
    let mut frames = FrameBuffer::default();
    let mut mirror = Value::Null;

    loop {
        if tx.is_closed() {
            return Ok(());
        }

        let chunk = match timeout(stale_connection_timeout, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => {
                error!("❌ Realtime stream error: {}", e);
                return Err(e.into());
            }
            Ok(None) => {
                warn!("🔴 Realtime stream ended");
                return Err(StoreError::Stream("stream closed".to_string()));
            }
            Err(_) => {
                warn!("⏳ No data for {} seconds. Reconnecting...", stale_connection_timeout.as_secs());
                return Err(StoreError::Stream("timeout".to_string()));
            }
        };

        for frame in frames.push(&chunk) {
            let event = StreamEvent::try_from(ServerSentEvent::<Value>::from_str(&frame)?)?;
            debug!(event = frame.as_str(), "🔸 Received event: {:?}", event);

            match event {
                StreamEvent::Put(change) => change.apply_put(&mut mirror),
                StreamEvent::Patch(change) => change.apply_patch(&mut mirror),
                StreamEvent::KeepAlive => {
                    trace!("Keep-alive");
                    continue;
                }
                StreamEvent::Cancel(reason) => return Err(StoreError::Stream(format!("cancelled by the server: {}", reason))),
                StreamEvent::AuthRevoked => return Err(StoreError::Stream("credentials revoked".to_string())),
                StreamEvent::Unknown(name) => {
                    debug!("Ignoring unknown event '{}'", name);
                    continue;
                }
            }

            let record = match LocationRecord::from_value(mirror.clone()) {
                Ok(record) => record,
                Err(e) => {
                    warn!("⚠️ Ignoring malformed location record: {}", e);
                    continue;
                }
            };

            if tx.send(record).await.is_err() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LatLng;
    use crate::store::new_client;
    use mockito::{Mock, Server};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;
    use tokio::sync::mpsc::{self, Receiver};
    use tokio::task::JoinHandle;

    const RECORD: &str = "event: put\ndata: {\"path\":\"/\",\"data\":{\"lat\":1.0,\"lng\":1.0,\"timestamp\":1000}}\n\n";

    fn config(stale_connection_timeout: Duration) -> ListenConfig {
        ListenConfig {
            retry: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(5),
            stale_connection_timeout,
        }
    }

    fn record() -> Option<LocationRecord> {
        Some(LocationRecord::new(LatLng::new(1.0, 1.0), 1000))
    }

    /// Serves `events` and then keeps the connection open without sending any event.
    async fn open_stream(server: &mut Server, events: String) -> Mock {
        server
            .mock("GET", "/locations/user_12345.json")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_chunked_body(move |w| {
                w.write_all(events.as_bytes())?;
                // Comments only, and less often than the shortest stale timeout used here
                for _ in 0..20 {
                    std::thread::sleep(Duration::from_millis(150));
                    w.write_all(b":\n\n")?;
                }
                Ok(())
            })
            .expect_at_least(2)
            .create_async()
            .await
    }

    fn spawn_listener(server: &Server, config: ListenConfig) -> (JoinHandle<Result<(), StoreError>>, Receiver<Option<LocationRecord>>) {
        let (tx, rx) = mpsc::channel(8);
        let url = format!("{}/locations/user_12345.json", server.url());
        let listener = tokio::spawn(async move {
            let client = new_client()?;
            listen(&client, &url, tx, &config).await
        });
        (listener, rx)
    }

    async fn receive(rx: &mut Receiver<Option<LocationRecord>>, count: usize) -> Vec<Option<LocationRecord>> {
        let mut received = Vec::new();
        for _ in 0..count {
            let record = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.expect("no record received in time");
            received.push(record.expect("listener ended early"));
        }
        received
    }

    #[rstest]
    #[case(Duration::from_millis(500), vec![1000, 2000, 4000, 8000, 16000, 30000, 30000])]
    #[case(Duration::from_millis(1), vec![2, 4, 8, 16, 32, 64, 128])]
    fn reconnect_delays_double_the_retry_delay(#[case] retry: Duration, #[case] expected: Vec<u64>) {
        let config = ListenConfig {
            retry,
            retry_max_delay: Duration::from_secs(30),
            stale_connection_timeout: Duration::from_secs(60),
        };

        let delays: Vec<u64> = reconnect_delays(&config).take(7).map(|delay| delay.as_millis() as u64).collect();

        assert_eq!(delays, expected);
    }

    #[rstest]
    #[case("event: cancel\ndata: \"Permission denied\"\n\n")]
    #[case("event: auth_revoked\ndata: null\n\n")]
    #[tokio::test]
    async fn reconnects_when_the_server_ends_the_stream(#[case] ending: &str) {
        let mut server = Server::new_async().await;
        let mock = open_stream(&mut server, format!("{}{}", RECORD, ending)).await;

        let (listener, mut rx) = spawn_listener(&server, config(Duration::from_secs(10)));

        assert_eq!(receive(&mut rx, 2).await, vec![record(), record()]);
        listener.abort();
        mock.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn reconnects_when_the_stream_goes_silent() {
        let mut server = Server::new_async().await;
        let mock = open_stream(&mut server, RECORD.to_string()).await;

        let (listener, mut rx) = spawn_listener(&server, config(Duration::from_millis(100)));

        assert_eq!(receive(&mut rx, 2).await, vec![record(), record()]);
        listener.abort();
        mock.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn skips_malformed_records() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/locations/user_12345.json")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(format!("event: put\ndata: {{\"path\":\"/\",\"data\":{{\"lat\":1.0}}}}\n\n{}", RECORD))
            .create_async()
            .await;

        let (listener, mut rx) = spawn_listener(&server, config(Duration::from_secs(10)));

        assert_eq!(receive(&mut rx, 1).await, vec![record()]);
        listener.abort();
    }

    #[test_log::test(tokio::test)]
    async fn stops_when_the_receiver_goes_away() {
        let mut server = Server::new_async().await;
        let _mock = open_stream(&mut server, RECORD.to_string()).await;

        let (listener, mut rx) = spawn_listener(&server, config(Duration::from_millis(100)));
        receive(&mut rx, 1).await;
        drop(rx);

        let result = tokio::time::timeout(Duration::from_secs(1), listener).await.expect("listener did not stop");
        assert!(matches!(result, Ok(Ok(()))));
    }
}
