//! Connector timeouts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Timeouts applied to one database file.
///
/// Deserializes from JSON with millisecond fields; missing fields keep
/// their defaults:
///
/// ```
/// use std::time::Duration;
/// use microdb::ConnectorConfig;
///
/// let config = ConnectorConfig::from_json(r#"{ "hard_timeout_ms": 5000 }"#).unwrap();
/// assert_eq!(config.hard_timeout, Duration::from_secs(5));
/// assert_eq!(config.lock_timeout, Duration::from_secs(15));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Budget for opening the file.
    #[serde(rename = "open_timeout_ms", with = "millis")]
    pub open_timeout: Duration,
    /// Budget for waiting on the connection lock.
    #[serde(rename = "lock_timeout_ms", with = "millis")]
    pub lock_timeout: Duration,
    /// A statement or lock hold running past this logs a warning.
    #[serde(rename = "soft_timeout_ms", with = "millis")]
    pub soft_timeout: Duration,
    /// A statement running past this is abandoned and the connection closed.
    #[serde(rename = "hard_timeout_ms", with = "millis")]
    pub hard_timeout: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(3),
            lock_timeout: Duration::from_secs(15),
            soft_timeout: Duration::from_secs(15),
            hard_timeout: Duration::from_secs(60),
        }
    }
}

impl ConnectorConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the open timeout.
    #[must_use]
    pub const fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Sets the lock timeout.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the soft and hard statement timeouts.
    #[must_use]
    pub const fn statement_timeouts(mut self, soft: Duration, hard: Duration) -> Self {
        self.soft_timeout = soft;
        self.hard_timeout = hard;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
