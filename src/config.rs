//! Configuration types for transfer-tracker

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for [`JobController`](crate::JobController)
///
/// Every field has a default, so `Config::default()` and `{}` in JSON are both valid.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Status polling behaviour
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Where transfers are written
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Update delivery
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// REST API server
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Reject values the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tracking.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".to_string(),
                key: Some("tracking.poll_interval_ms".to_string()),
            });
        }

        if self.tracking.max_transient_failures == 0 {
            return Err(Error::Config {
                message: "max_transient_failures must be at least 1".to_string(),
                key: Some("tracking.max_transient_failures".to_string()),
            });
        }

        if self.dispatch.event_buffer == 0 {
            return Err(Error::Config {
                message: "event buffer must hold at least one event".to_string(),
                key: Some("dispatch.event_buffer".to_string()),
            });
        }

        Ok(())
    }
}

/// Status polling configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Delay between two status queries for the same job (default: 1000 ms)
    #[serde(
        rename = "poll_interval_ms",
        with = "duration_millis_serde",
        default = "default_poll_interval"
    )]
    pub poll_interval: Duration,

    /// Consecutive transient backend failures tolerated before a job is
    /// marked failed (default: 5)
    #[serde(default = "default_max_transient_failures")]
    pub max_transient_failures: u32,

    /// How long shutdown waits for running pollers to exit (default: 10 seconds)
    #[serde(with = "duration_serde", default = "default_shutdown_timeout")]
    pub shutdown_timeout: Duration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_transient_failures: default_max_transient_failures(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Transfer destination configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Directory passed to the backend as destination hint (default: "./downloads")
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            destination_dir: default_destination_dir(),
        }
    }
}

/// Update delivery configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Capacity of the broadcast channel feeding event subscribers (default: 1000)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_transient_failures() -> u32 {
    5
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_destination_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_event_buffer() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration as whole milliseconds
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
