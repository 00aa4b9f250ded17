/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Resequencer configuration.
//!
//! Configurations deserialize from JSON with every field optional; missing
//! fields take the defaults below. Durations are given in milliseconds.
//!
//! ```
//! use resequencer_rs::ResequencerConfig;
//!
//! let config = ResequencerConfig::from_json(
//!     r#"{ "mode": "stream", "out_of_sequence_timeout_ms": 250 }"#,
//! ).unwrap();
//! assert!(matches!(config, ResequencerConfig::Stream(_)));
//! ```

use super::sequence::DuplicatePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors produced while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("invalid resequencer configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field has a value the engine cannot run with.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value is rejected.
        reason: &'static str,
    },
}

/// What `stop` does with elements still buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Deliver everything still pending, in order, ignoring gaps.
    Flush,
    /// Discard everything still pending.
    Drop,
}

/// Batch mode settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Window size that triggers an immediate flush.
    pub capacity: usize,
    /// Longest time a window stays open.
    pub batch_timeout_ms: u64,
    /// Period between driver ticks.
    pub delivery_interval_ms: u64,
    /// Handling of elements comparing equal to a pending one.
    pub duplicates: DuplicatePolicy,
    /// Emit batches in descending order.
    pub reverse: bool,
    /// Drop invalid elements silently instead of returning an error.
    pub ignore_invalid: bool,
    /// Behavior of `stop` for pending elements.
    pub stop_policy: StopPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            batch_timeout_ms: 1_000,
            delivery_interval_ms: 100,
            duplicates: DuplicatePolicy::Reject,
            reverse: false,
            ignore_invalid: false,
            stop_policy: StopPolicy::Flush,
        }
    }
}

impl BatchConfig {
    /// Returns the batch timeout.
    #[must_use]
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    /// Returns the driver tick period.
    #[must_use]
    pub fn delivery_interval(&self) -> Duration {
        Duration::from_millis(self.delivery_interval_ms)
    }

    /// Checks that the engine can run with these settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero capacity, timeout or
    /// interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capacity",
                reason: "must be at least 1",
            });
        }
        if self.batch_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_timeout_ms",
                reason: "must be greater than zero",
            });
        }
        if self.delivery_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "delivery_interval_ms",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

/// Stream mode settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum number of pending elements; `None` is unbounded.
    pub capacity: Option<usize>,
    /// How long a head element waits for its predecessor before it is
    /// force-delivered.
    pub out_of_sequence_timeout_ms: u64,
    /// Period between driver ticks.
    pub delivery_interval_ms: u64,
    /// Refuse elements that are not after the last delivered one.
    pub reject_old: bool,
    /// Handling of elements comparing equal to a pending one.
    pub duplicates: DuplicatePolicy,
    /// Drop invalid elements silently instead of returning an error.
    pub ignore_invalid: bool,
    /// Behavior of `stop` for pending elements.
    pub stop_policy: StopPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: Some(1_000),
            out_of_sequence_timeout_ms: 1_000,
            delivery_interval_ms: 100,
            reject_old: false,
            duplicates: DuplicatePolicy::Reject,
            ignore_invalid: false,
            stop_policy: StopPolicy::Drop,
        }
    }
}

impl StreamConfig {
    /// Returns the out-of-sequence timeout.
    #[must_use]
    pub fn out_of_sequence_timeout(&self) -> Duration {
        Duration::from_millis(self.out_of_sequence_timeout_ms)
    }

    /// Returns the driver tick period.
    #[must_use]
    pub fn delivery_interval(&self) -> Duration {
        Duration::from_millis(self.delivery_interval_ms)
    }

    /// Checks that the engine can run with these settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero capacity, timeout or
    /// interval, and for [`DuplicatePolicy::Allow`], which would leave two
    /// elements competing for the same position in the stream.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "capacity",
                reason: "must be at least 1",
            });
        }
        if self.out_of_sequence_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "out_of_sequence_timeout_ms",
                reason: "must be greater than zero",
            });
        }
        if self.delivery_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "delivery_interval_ms",
                reason: "must be greater than zero",
            });
        }
        if self.duplicates == DuplicatePolicy::Allow {
            return Err(ConfigError::InvalidValue {
                field: "duplicates",
                reason: "stream mode cannot keep duplicate elements",
            });
        }
        Ok(())
    }
}

/// Configuration for either engine, tagged by `mode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResequencerConfig {
    /// Batch windowing.
    Batch(BatchConfig),
    /// Gap-detecting stream.
    Stream(StreamConfig),
}

impl ResequencerConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::InvalidValue`] when validation fails.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the selected mode's settings.
    ///
    /// # Errors
    ///
    /// See [`BatchConfig::validate`] and [`StreamConfig::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Batch(config) => config.validate(),
            Self::Stream(config) => config.validate(),
        }
    }

    /// Returns the driver tick period of the selected mode.
    #[must_use]
    pub fn delivery_interval(&self) -> Duration {
        match self {
            Self::Batch(config) => config.delivery_interval(),
            Self::Stream(config) => config.delivery_interval(),
        }
    }

    /// Returns the stop policy of the selected mode.
    #[must_use]
    pub fn stop_policy(&self) -> StopPolicy {
        match self {
            Self::Batch(config) => config.stop_policy,
            Self::Stream(config) => config.stop_policy,
        }
    }
}
