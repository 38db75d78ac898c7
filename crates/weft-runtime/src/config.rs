#![forbid(unsafe_code)]

//! Scheduler configuration.
//!
//! [`SchedulerConfig`] holds the knobs of the time-sliced work loop. Values
//! are sanitized on use: anything out of range falls back to its default
//! rather than failing. With the `config-file` feature the config can also be
//! read from TOML, where invalid values are reported as [`ConfigError`].
//!
//! ```toml
//! yield_threshold_us = 1000
//! min_units_per_turn = 1
//! idle_period_ms = 16
//! ```

use std::time::Duration;

/// Default minimum remaining time before yielding.
pub const DEFAULT_YIELD_THRESHOLD: Duration = Duration::from_millis(1);
/// Default number of units performed before the deadline is consulted.
pub const DEFAULT_MIN_UNITS_PER_TURN: usize = 1;
/// Default idle period for hosts that pick their own budget.
pub const DEFAULT_IDLE_PERIOD: Duration = Duration::from_millis(16);

const MAX_IDLE_PERIOD: Duration = Duration::from_secs(1);

/// Work-loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Yield once the deadline reports less than this.
    /// Default: 1 ms
    pub yield_threshold: Duration,

    /// Units of work performed in every turn before the deadline is
    /// consulted. Zero is treated as one.
    /// Default: 1
    pub min_units_per_turn: usize,

    /// Idle period used by hosts that do not supply their own deadline.
    /// Default: 16 ms (one frame at 60 Hz)
    pub idle_period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            yield_threshold: DEFAULT_YIELD_THRESHOLD,
            min_units_per_turn: DEFAULT_MIN_UNITS_PER_TURN,
            idle_period: DEFAULT_IDLE_PERIOD,
        }
    }
}

impl SchedulerConfig {
    /// Set the yield threshold.
    #[must_use]
    pub fn with_yield_threshold(mut self, threshold: Duration) -> Self {
        self.yield_threshold = threshold;
        self
    }

    /// Set the per-turn unit floor.
    #[must_use]
    pub fn with_min_units_per_turn(mut self, units: usize) -> Self {
        self.min_units_per_turn = units;
        self
    }

    /// Set the idle period.
    #[must_use]
    pub fn with_idle_period(mut self, period: Duration) -> Self {
        self.idle_period = period;
        self
    }

    /// Copy with out-of-range values replaced.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut config = *self;
        config.min_units_per_turn = config.min_units_per_turn.max(1);
        config.idle_period = normalize_period(config.idle_period);
        if config.yield_threshold > config.idle_period {
            config.yield_threshold = DEFAULT_YIELD_THRESHOLD.min(config.idle_period);
        }
        config
    }
}

fn normalize_period(period: Duration) -> Duration {
    if period.is_zero() {
        DEFAULT_IDLE_PERIOD
    } else {
        period.min(MAX_IDLE_PERIOD)
    }
}

// ============================================================================
// TOML loading
// ============================================================================

/// Failure to load a [`SchedulerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The input was not valid TOML for the expected fields.
    #[cfg(feature = "config-file")]
    #[error("invalid scheduler config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed but its value is unusable.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(feature = "config-file")]
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    yield_threshold_us: Option<u64>,
    min_units_per_turn: Option<usize>,
    idle_period_ms: Option<u64>,
}

#[cfg(feature = "config-file")]
impl SchedulerConfig {
    /// Parse a config from TOML. Missing fields keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(input)?;
        let mut config = Self::default();

        if let Some(units) = file.min_units_per_turn {
            if units == 0 {
                return Err(ConfigError::Invalid {
                    field: "min_units_per_turn",
                    reason: "must be at least 1".to_owned(),
                });
            }
            config.min_units_per_turn = units;
        }
        if let Some(ms) = file.idle_period_ms {
            let period = Duration::from_millis(ms);
            if period.is_zero() || period > MAX_IDLE_PERIOD {
                return Err(ConfigError::Invalid {
                    field: "idle_period_ms",
                    reason: format!("must be between 1 and {}", MAX_IDLE_PERIOD.as_millis()),
                });
            }
            config.idle_period = period;
        }
        if let Some(us) = file.yield_threshold_us {
            let threshold = Duration::from_micros(us);
            if threshold > config.idle_period {
                return Err(ConfigError::Invalid {
                    field: "yield_threshold_us",
                    reason: format!(
                        "{us}us exceeds the idle period of {}ms",
                        config.idle_period.as_millis()
                    ),
                });
            }
            config.yield_threshold = threshold;
        }

        tracing::debug!(?config, "scheduler config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SchedulerConfig::default();
        assert_eq!(config.yield_threshold, Duration::from_millis(1));
        assert_eq!(config.min_units_per_turn, 1);
        assert_eq!(config.idle_period, Duration::from_millis(16));
        assert_eq!(config.sanitized(), config);
    }

    #[test]
    fn sanitized_repairs_out_of_range_values() {
        let config = SchedulerConfig::default()
            .with_min_units_per_turn(0)
            .with_idle_period(Duration::ZERO)
            .with_yield_threshold(Duration::from_secs(5))
            .sanitized();
        assert_eq!(config.min_units_per_turn, 1);
        assert_eq!(config.idle_period, DEFAULT_IDLE_PERIOD);
        assert_eq!(config.yield_threshold, DEFAULT_YIELD_THRESHOLD);
    }

    #[test]
    fn sanitized_caps_idle_period() {
        let config = SchedulerConfig::default()
            .with_idle_period(Duration::from_secs(30))
            .sanitized();
        assert_eq!(config.idle_period, Duration::from_secs(1));
    }

    #[cfg(feature = "config-file")]
    mod toml_loading {
        use super::*;

        #[test]
        fn empty_input_yields_defaults() {
            assert_eq!(
                SchedulerConfig::from_toml_str("").unwrap(),
                SchedulerConfig::default()
            );
        }

        #[test]
        fn fields_override_defaults() {
            let config = SchedulerConfig::from_toml_str(
                "yield_threshold_us = 500\nmin_units_per_turn = 4\nidle_period_ms = 50\n",
            )
            .unwrap();
            assert_eq!(config.yield_threshold, Duration::from_micros(500));
            assert_eq!(config.min_units_per_turn, 4);
            assert_eq!(config.idle_period, Duration::from_millis(50));
        }

        #[test]
        fn unknown_field_is_a_parse_error() {
            let err = SchedulerConfig::from_toml_str("frame_rate = 60").unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)));
        }

        #[test]
        fn zero_units_is_rejected() {
            let err = SchedulerConfig::from_toml_str("min_units_per_turn = 0").unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid {
                    field: "min_units_per_turn",
                    ..
                }
            ));
        }

        #[test]
        fn threshold_longer_than_period_is_rejected() {
            let err = SchedulerConfig::from_toml_str("idle_period_ms = 2\nyield_threshold_us = 5000")
                .unwrap_err();
            assert!(err.to_string().contains("yield_threshold_us"));
        }
    }
}
