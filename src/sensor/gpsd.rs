use crate::domain::{LocationSample, SampleError, SampleResult};
use crate::sensor::gpsd_report::{Fix, GpsdReport};
use crate::sensor::{LocationSensor, SensorError, WatchOptions};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::timeout_at;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, instrument, trace, warn};

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true}\n";
const CHANNEL_CAPACITY: usize = 16;

type LastFix = Arc<Mutex<Option<(LocationSample, Instant)>>>;

/// Reads fixes from a gpsd daemon.
#[derive(Debug)]
pub struct GpsdSensor {
    address: String,
    last_fix: LastFix,
}

impl GpsdSensor {
    pub fn new(address: impl Into<String>) -> Self {
        GpsdSensor {
            address: address.into(),
            last_fix: Arc::new(Mutex::new(None)),
        }
    }

    fn cached_fix(&self, max_age: Duration) -> Option<LocationSample> {
        if max_age.is_zero() {
            return None;
        }

        let guard = self.last_fix.lock().unwrap_or_else(PoisonError::into_inner);
        (*guard).filter(|(_, acquired_at)| acquired_at.elapsed() <= max_age).map(|(sample, _)| sample)
    }
}

#[async_trait]
impl LocationSensor for GpsdSensor {
    #[instrument(skip(self), fields(address = %self.address))]
    async fn watch(&self, options: WatchOptions) -> Result<Receiver<SampleResult>, SensorError> {
        info!("🛰️ Connecting to gpsd...");
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let stream = match TcpStream::connect(&self.address).await {
            Ok(stream) => stream,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!("🛰️ Connecting to gpsd... failed, {}", e);
                // Reported through the watch, like any other failed sample
                let _ = tx.try_send(Err(SampleError::PermissionDenied));
                return Ok(rx);
            }
            Err(e) => {
                return Err(SensorError::CapabilityUnavailable(format!("unable to connect to gpsd at {}: {}", self.address, e)));
            }
        };

        let (read_half, mut write_half) = stream.into_split();
        write_half
            .write_all(WATCH_COMMAND)
            .await
            .map_err(|e| SensorError::CapabilityUnavailable(format!("unable to start watching gpsd at {}: {}", self.address, e)))?;
        info!("🛰️ Connecting to gpsd... OK");

        if let Some(sample) = self.cached_fix(options.max_cached_age) {
            debug!("🛰️ Handing out cached fix {}", sample.position);
            let _ = tx.try_send(Ok(sample));
        }

        let lines = LinesStream::new(BufReader::new(read_half).lines());
        let last_fix = self.last_fix.clone();
        tokio::spawn(async move {
            read_reports(lines, tx, options, last_fix).await;
            // gpsd stops reporting once the connection is closed
            drop(write_half);
        });

        Ok(rx)
    }
}

async fn read_reports<S>(mut lines: S, tx: Sender<SampleResult>, options: WatchOptions, last_fix: LastFix)
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    let mut deadline = options.timeout.map(|limit| tokio::time::Instant::now() + limit);
    let mut reported_missing_fix = false;

    loop {
        let read = async {
            match deadline {
                Some(at) => timeout_at(at, lines.next()).await.ok(),
                None => Some(lines.next().await),
            }
        };

        let next = tokio::select! {
            () = tx.closed() => {
                debug!("Watch ended, disconnecting from gpsd");
                return;
            }
            read = read => read,
        };

        let Some(next) = next else {
            let limit = options.timeout.unwrap_or_default();
            deadline = Some(tokio::time::Instant::now() + limit);
            if tx.send(Err(SampleError::Timeout(limit))).await.is_err() {
                return;
            }
            continue;
        };

        let line = match next {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!("🔴 Reading from gpsd failed: {}", e);
                let _ = tx.send(Err(SampleError::PositionUnavailable(e.to_string()))).await;
                return;
            }
            None => {
                warn!("🔴 gpsd closed the connection");
                let _ = tx.send(Err(SampleError::PositionUnavailable("gpsd closed the connection".to_string()))).await;
                return;
            }
        };

        let report = match serde_json::from_str::<GpsdReport>(&line) {
            Ok(report) => report,
            Err(e) => {
                debug!(line = line.as_str(), "Skipping unreadable gpsd report: {}", e);
                continue;
            }
        };

        let result = match report {
            GpsdReport::Tpv(tpv) => match tpv.fix(options.high_accuracy) {
                Fix::Acquired(sample) => {
                    reported_missing_fix = false;
                    deadline = options.timeout.map(|limit| tokio::time::Instant::now() + limit);
                    *last_fix.lock().unwrap_or_else(PoisonError::into_inner) = Some((sample, Instant::now()));
                    Ok(sample)
                }
                Fix::Imprecise => {
                    trace!("Skipping 2D fix, a 3D fix is required");
                    continue;
                }
                Fix::Missing if reported_missing_fix => continue,
                Fix::Missing => {
                    reported_missing_fix = true;
                    Err(SampleError::PositionUnavailable("the receiver has no fix".to_string()))
                }
            },
            GpsdReport::Error { message } => Err(SampleError::PositionUnavailable(message)),
            GpsdReport::Other => continue,
        };

        if tx.send(result).await.is_err() {
            debug!("Watch ended, disconnecting from gpsd");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LatLng;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use test_log::test;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const FIX: &str = r#"{"class":"TPV","mode":3,"lat":37.7749,"lon":-122.4194,"eph":3.2}"#;
    const NO_FIX: &str = r#"{"class":"TPV","mode":1}"#;

    async fn collect(lines: Vec<&str>, options: WatchOptions) -> Vec<SampleResult> {
        let (tx, mut rx) = mpsc::channel(16);
        let lines = stream::iter(lines.into_iter().map(|line| Ok::<String, io::Error>(line.to_string())).collect::<Vec<_>>());

        read_reports(lines, tx, options, Arc::new(Mutex::new(None))).await;

        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    fn sample() -> LocationSample {
        LocationSample::new(LatLng::new(37.7749, -122.4194), Some(3.2))
    }

    fn closed() -> SampleResult {
        Err(SampleError::PositionUnavailable("gpsd closed the connection".to_string()))
    }

    #[test(tokio::test)]
    async fn read_reports_forwards_fixes() {
        let results = collect(vec![r#"{"class":"VERSION"}"#, FIX, "garbage", FIX], WatchOptions::default()).await;

        assert_eq!(results, vec![Ok(sample()), Ok(sample()), closed()]);
    }

    #[test(tokio::test)]
    async fn read_reports_reports_a_missing_fix_once() {
        let results = collect(vec![NO_FIX, NO_FIX, FIX, NO_FIX], WatchOptions::default()).await;

        let no_fix = Err(SampleError::PositionUnavailable("the receiver has no fix".to_string()));
        assert_eq!(results, vec![no_fix.clone(), Ok(sample()), no_fix, closed()]);
    }

    #[test(tokio::test)]
    async fn read_reports_forwards_gpsd_errors() {
        let results = collect(vec![r#"{"class":"ERROR","message":"Unrecognized request '?FOO'"}"#], WatchOptions::default()).await;

        assert_eq!(
            results,
            vec![Err(SampleError::PositionUnavailable("Unrecognized request '?FOO'".to_string())), closed()]
        );
    }

    #[test(tokio::test)]
    async fn read_reports_reports_a_timeout_when_no_fix_arrives() {
        let (tx, mut rx) = mpsc::channel(4);
        let options = WatchOptions {
            timeout: Some(Duration::from_millis(20)),
            ..WatchOptions::default()
        };

        let reader = tokio::spawn(read_reports(stream::pending::<io::Result<String>>(), tx, options, Arc::new(Mutex::new(None))));

        let result = timeout(Duration::from_secs(1), rx.recv()).await.expect("no timeout reported");
        assert_eq!(result, Some(Err(SampleError::Timeout(Duration::from_millis(20)))));

        drop(rx);
        timeout(Duration::from_secs(1), reader).await.expect("reader did not stop").expect("reader panicked");
    }

    #[test(tokio::test)]
    async fn read_reports_stops_when_the_watch_is_dropped_while_gpsd_is_silent() {
        let (tx, rx) = mpsc::channel(4);

        let reader = tokio::spawn(read_reports(stream::pending::<io::Result<String>>(), tx, WatchOptions::default(), Arc::new(Mutex::new(None))));
        drop(rx);

        timeout(Duration::from_secs(1), reader).await.expect("reader did not stop").expect("reader panicked");
    }

    #[test(tokio::test)]
    async fn watch_fails_when_gpsd_is_not_running() -> io::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?.to_string();
        drop(listener);

        let result = GpsdSensor::new(address).watch(WatchOptions::default()).await;

        assert!(matches!(result, Err(SensorError::CapabilityUnavailable(_))));
        Ok(())
    }

    #[test(tokio::test)]
    async fn watch_enables_watching_and_streams_fixes() -> io::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let sensor = GpsdSensor::new(listener.local_addr()?.to_string());

        let gpsd = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let mut command = vec![0u8; WATCH_COMMAND.len()];
            socket.read_exact(&mut command).await?;
            socket.write_all(format!("{}\n", FIX).as_bytes()).await?;
            socket.flush().await?;
            Ok::<Vec<u8>, io::Error>(command)
        });

        let mut rx = sensor.watch(WatchOptions::default()).await.expect("watch failed");

        let result = timeout(Duration::from_secs(1), rx.recv()).await.expect("no sample received");
        assert_eq!(result, Some(Ok(sample())));
        assert_eq!(gpsd.await.expect("gpsd panicked")?, WATCH_COMMAND.to_vec());
        Ok(())
    }

    #[test(tokio::test)]
    async fn watch_hands_out_a_cached_fix_when_allowed() -> io::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let sensor = GpsdSensor::new(listener.local_addr()?.to_string());
        *sensor.last_fix.lock().unwrap() = Some((sample(), Instant::now()));

        let options = WatchOptions {
            max_cached_age: Duration::from_secs(60),
            ..WatchOptions::default()
        };
        let mut rx = sensor.watch(options).await.expect("watch failed");

        let result = timeout(Duration::from_secs(1), rx.recv()).await.expect("no sample received");
        assert_eq!(result, Some(Ok(sample())));
        Ok(())
    }

    #[test]
    fn cached_fix_is_never_used_with_a_zero_max_age() {
        let sensor = GpsdSensor::new("127.0.0.1:2947");
        *sensor.last_fix.lock().unwrap() = Some((sample(), Instant::now()));

        assert_eq!(sensor.cached_fix(Duration::ZERO), None);
        assert_eq!(sensor.cached_fix(Duration::from_secs(1)), Some(sample()));
    }
}
