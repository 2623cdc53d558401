//! Retry configuration
//!
//! A [`RetryConfig`] is immutable per call. Callers adjust it per call with
//! [`RetryOverrides`]; unspecified fields keep the base value.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff and timeout settings for one execution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first try
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(rename = "initial_delay_ms", with = "millis")]
    pub initial_delay: Duration,
    /// Upper bound on any computed delay
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
    /// Exponential growth factor
    pub backoff_multiplier: f64,
    /// Per-attempt wall-clock budget
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
            timeout: Duration::from_millis(60_000),
        }
    }
}

impl RetryConfig {
    /// One attempt, no backoff
    #[must_use]
    pub fn single_attempt(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            timeout,
        }
    }

    /// Apply per-call overrides
    #[must_use]
    pub fn merge(&self, overrides: &RetryOverrides) -> Self {
        Self {
            max_attempts: overrides.max_attempts.unwrap_or(self.max_attempts),
            initial_delay: overrides.initial_delay.unwrap_or(self.initial_delay),
            max_delay: overrides.max_delay.unwrap_or(self.max_delay),
            backoff_multiplier: overrides
                .backoff_multiplier
                .unwrap_or(self.backoff_multiplier),
            timeout: overrides.timeout.unwrap_or(self.timeout),
        }
    }

    /// Check field ranges
    ///
    /// # Errors
    /// - `ConfigError::ZeroAttempts` when `max_attempts == 0`
    /// - `ConfigError::Multiplier` when the multiplier is below 1 or not finite
    /// - `ConfigError::ZeroTimeout` when the timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Multiplier(self.backoff_multiplier));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Delay after the given failed attempt (1-based)
    ///
    /// `min(initial_delay * backoff_multiplier^(attempt-1), max_delay)`
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let millis = self.initial_delay.as_secs_f64() * 1000.0 * self.backoff_multiplier.powi(exponent);
        let cap = self.max_delay.as_secs_f64() * 1000.0;

        if !millis.is_finite() || millis >= cap {
            return self.max_delay;
        }
        Duration::from_secs_f64(millis.max(0.0) / 1000.0)
    }
}

/// Partial [`RetryConfig`]; `None` keeps the base value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RetryOverrides {
    pub max_attempts: Option<u32>,
    pub initial_delay: Option<Duration>,
    pub max_delay: Option<Duration>,
    pub backoff_multiplier: Option<f64>,
    pub timeout: Option<Duration>,
}

impl RetryOverrides {
    /// No overrides
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// With attempt budget
    #[inline]
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// With initial delay
    #[inline]
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// With delay cap
    #[inline]
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// With backoff multiplier
    #[inline]
    #[must_use]
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// With per-attempt timeout
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(1000));
        assert_eq!(config.max_delay, Duration::from_millis(30_000));
        assert_eq!(config.backoff_multiplier, 2.0);
        assert_eq!(config.timeout, Duration::from_millis(60_000));
    }

    #[test]
    fn backoff_sequence_is_clamped() {
        let config = RetryConfig {
            max_attempts: 10,
            ..RetryConfig::default()
        };
        let delays: Vec<u128> = (1..=7).map(|a| config.backoff_delay(a).as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000]);
    }

    #[test]
    fn backoff_survives_huge_attempts() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_delay(u32::MAX), config.max_delay);
    }

    #[test]
    fn merge_keeps_unspecified_fields() {
        let base = RetryConfig::default();
        let merged = base.merge(
            &RetryOverrides::none()
                .max_attempts(2)
                .timeout(Duration::from_millis(50)),
        );

        assert_eq!(merged.max_attempts, 2);
        assert_eq!(merged.timeout, Duration::from_millis(50));
        assert_eq!(merged.initial_delay, base.initial_delay);
        assert_eq!(merged.backoff_multiplier, base.backoff_multiplier);
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let base = RetryConfig::default();
        assert!(matches!(
            base.merge(&RetryOverrides::none().max_attempts(0)).validate(),
            Err(ConfigError::ZeroAttempts)
        ));
        assert!(matches!(
            base.merge(&RetryOverrides::none().backoff_multiplier(0.5)).validate(),
            Err(ConfigError::Multiplier(_))
        ));
        assert!(matches!(
            base.merge(&RetryOverrides::none().timeout(Duration::ZERO)).validate(),
            Err(ConfigError::ZeroTimeout)
        ));
        assert!(base.validate().is_ok());
        assert!(RetryConfig::single_attempt(Duration::from_secs(1)).validate().is_ok());
    }

    #[test]
    fn deserializes_millisecond_fields() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_attempts": 5, "timeout_ms": 1500}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.initial_delay, Duration::from_millis(1000));
    }

    proptest! {
        #[test]
        fn prop_backoff_matches_formula_and_cap(
            initial in 1u64..5_000,
            multiplier in 1.0f64..4.0,
            cap in 1u64..120_000,
            attempt in 1u32..20,
        ) {
            let config = RetryConfig {
                max_attempts: 20,
                initial_delay: Duration::from_millis(initial),
                max_delay: Duration::from_millis(cap),
                backoff_multiplier: multiplier,
                timeout: Duration::from_secs(1),
            };
            let delay = config.backoff_delay(attempt);
            prop_assert!(delay <= config.max_delay);

            let expected = (initial as f64 * multiplier.powi(attempt as i32 - 1)).min(cap as f64);
            let actual = delay.as_secs_f64() * 1000.0;
            prop_assert!((actual - expected).abs() < 1.0);
        }

        #[test]
        fn prop_backoff_is_monotonic(attempt in 1u32..30) {
            let config = RetryConfig::default();
            prop_assert!(config.backoff_delay(attempt) <= config.backoff_delay(attempt + 1));
        }
    }
}
