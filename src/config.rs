// Serial defaults, poll cadence, and the on-disk settings format
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

// Micronix MMC controllers ship configured for 38400 8N1
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

// Per-read timeout; a line read that hits it returns whatever arrived
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

// Polling loop cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

// Shorter poll periods are raised to this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// Frame terminator for both commands and queries
pub const FRAME_TERMINATOR: char = '\r';

// Suffix that turns a command into a read-only query
pub const QUERY_SUFFIX: char = '?';

// Marker the controller wraps query replies with
pub const REPLY_MARKER: char = '#';

/// Character size on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum DataBits {
    #[serde(rename = "5")]
    #[value(name = "5")]
    Five,
    #[serde(rename = "6")]
    #[value(name = "6")]
    Six,
    #[serde(rename = "7")]
    #[value(name = "7")]
    Seven,
    #[default]
    #[serde(rename = "8")]
    #[value(name = "8")]
    Eight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum StopBits {
    #[default]
    #[serde(rename = "1")]
    #[value(name = "1")]
    One,
    #[serde(rename = "2")]
    #[value(name = "2")]
    Two,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Errors raised while loading a settings file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Connection parameters for one session.
///
/// Everything except `port` has a default matching the controller's factory
/// configuration, so a settings file can be as small as `{"port": "/dev/ttyUSB0"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SerialSettings {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default)]
    pub data_bits: DataBits,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub stop_bits: StopBits,
    #[serde(
        default = "default_timeout",
        rename = "timeout_ms",
        deserialize_with = "millis::deserialize"
    )]
    pub timeout: Duration,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

impl SerialSettings {
    /// Settings for `port` with every other field at its default
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
