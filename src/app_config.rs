use crate::domain::Identity;
use crate::sensor::WatchOptions;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    tracking: Tracking,
    #[serde(default)]
    sensor: Sensor,
    store: Store,
    #[serde(default)]
    map: Map,
    #[serde(default)]
    publisher: Publisher,
    #[serde(default)]
    subscriber: Subscriber,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(config::File::with_name("config").required(true))
                .add_source(config::File::with_name("config_local").required(false))
                .add_source(config::Environment::with_prefix("LIVETRACK").separator("__")),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        if config.store.kind == StoreKind::Firebase && config.store.url.trim().is_empty() {
            return Err(ConfigError::Message("store.url is required for the firebase store".to_string()));
        }
        if config.store.retry.is_zero() {
            return Err(ConfigError::Message("store.retry must be longer than zero".to_string()));
        }

        Ok(config)
    }

    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }
}

#[derive(Debug, Deserialize)]
pub struct Tracking {
    identity: Identity,
}

impl Tracking {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sensor {
    gpsd_address: String,
    high_accuracy: bool,
    #[serde(with = "humantime_serde")]
    max_cached_age: Duration,
    #[serde(with = "humantime_serde")]
    timeout: Option<Duration>,
}

impl Default for Sensor {
    fn default() -> Self {
        Sensor {
            gpsd_address: "127.0.0.1:2947".to_string(),
            high_accuracy: true,
            max_cached_age: Duration::ZERO,
            timeout: None,
        }
    }
}

impl Sensor {
    pub fn gpsd_address(&self) -> &str {
        &self.gpsd_address
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            high_accuracy: self.high_accuracy,
            max_cached_age: self.max_cached_age,
            timeout: self.timeout,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Firebase,
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    kind: StoreKind,
    #[serde(default)]
    url: String,
    #[serde(default = "default_retry", with = "humantime_serde")]
    retry: Duration,
    #[serde(default = "default_retry_max_delay", with = "humantime_serde")]
    retry_max_delay: Duration,
    #[serde(default = "default_stale_connection_timeout", with = "humantime_serde")]
    stale_connection_timeout: Duration,
}

fn default_retry() -> Duration {
    Duration::from_millis(500)
}

fn default_retry_max_delay() -> Duration {
    Duration::from_secs(30)
}

// The realtime database sends a keep-alive every 30 seconds
fn default_stale_connection_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Store {
    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn retry(&self) -> Duration {
        self.retry
    }

    pub fn retry_max_delay(&self) -> Duration {
        self.retry_max_delay
    }

    pub fn stale_connection_timeout(&self) -> Duration {
        self.stale_connection_timeout
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Map {
    zoom: u8,
}

impl Default for Map {
    fn default() -> Self {
        Map { zoom: 15 }
    }
}

impl Map {
    pub fn zoom(&self) -> u8 {
        self.zoom
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Publisher {
    enabled: bool,
}

impl Default for Publisher {
    fn default() -> Self {
        Publisher { enabled: true }
    }
}

impl Publisher {
    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Subscriber {
    enabled: bool,
    buffer_size: usize,
}

impl Default for Subscriber {
    fn default() -> Self {
        Subscriber {
            enabled: true,
            buffer_size: 16,
        }
    }
}

impl Subscriber {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                tracking: Tracking {
                    identity: Identity::new("user_12345").unwrap(),
                },
                sensor: Sensor::default(),
                store: Store {
                    kind: StoreKind::Firebase,
                    url: "https://tracker.firebaseio.test".to_string(),
                    retry: Duration::from_millis(10),
                    retry_max_delay: Duration::from_millis(20),
                    stale_connection_timeout: Duration::from_secs(1),
                },
                map: Map::default(),
                publisher: Publisher::default(),
                subscriber: Subscriber::default(),
            },
        }
    }

    pub fn store_url(mut self, url: String) -> Self {
        self.config.store.url = url;
        self
    }

    pub fn stale_connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.store.stale_connection_timeout = timeout;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use pretty_assertions::assert_eq;

    fn load_from(toml: &str) -> Result<AppConfig, ConfigError> {
        AppConfig::from_builder(Config::builder().add_source(config::File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn applies_the_defaults() -> Result<(), ConfigError> {
        let config = load_from(
            r#"
            [tracking]
            identity = "user_12345"

            [store]
            kind = "firebase"
            url = "https://tracker.firebaseio.test"
            "#,
        )?;

        assert_eq!(config.tracking().identity().as_str(), "user_12345");
        assert_eq!(config.sensor().gpsd_address(), "127.0.0.1:2947");
        assert_eq!(
            config.sensor().watch_options(),
            WatchOptions {
                high_accuracy: true,
                max_cached_age: Duration::ZERO,
                timeout: None,
            }
        );
        assert_eq!(config.store().retry(), Duration::from_millis(500));
        assert_eq!(config.store().retry_max_delay(), Duration::from_secs(30));
        assert_eq!(config.store().stale_connection_timeout(), Duration::from_secs(60));
        assert_eq!(config.map().zoom(), 15);
        assert!(config.publisher().enabled());
        assert!(config.subscriber().enabled());
        assert_eq!(config.subscriber().buffer_size(), 16);
        Ok(())
    }

    #[test]
    fn parses_human_readable_durations() -> Result<(), ConfigError> {
        let config = load_from(
            r#"
            [tracking]
            identity = "user_12345"

            [sensor]
            max_cached_age = "5s"
            timeout = "1m"

            [store]
            kind = "memory"
            retry = "250ms"
            "#,
        )?;

        let options = config.sensor().watch_options();
        assert_eq!(options.max_cached_age, Duration::from_secs(5));
        assert_eq!(options.timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.store().kind(), StoreKind::Memory);
        assert_eq!(config.store().retry(), Duration::from_millis(250));
        Ok(())
    }

    #[test]
    fn fails_without_an_identity() {
        let result = load_from(
            r#"
            [tracking]
            identity = ""

            [store]
            kind = "memory"
            "#,
        );

        let message = result.unwrap_err().to_string();
        assert!(message.contains("identity must not be empty"), "unexpected error: {}", message);
    }

    #[test]
    fn fails_for_a_firebase_store_without_url() {
        let result = load_from(
            r#"
            [tracking]
            identity = "user_12345"

            [store]
            kind = "firebase"
            "#,
        );

        assert_eq!(result.unwrap_err().to_string(), "store.url is required for the firebase store");
    }

    #[test]
    fn fails_for_a_zero_retry_delay() {
        let result = load_from(
            r#"
            [tracking]
            identity = "user_12345"

            [store]
            kind = "memory"
            retry = "0s"
            "#,
        );

        assert_eq!(result.unwrap_err().to_string(), "store.retry must be longer than zero");
    }
}
