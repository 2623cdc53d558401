//! Error types for the retry executor
//!
//! - [`AttemptError`]: why a single attempt failed (timeout or the operation's own error)
//! - [`RetryError`]: what the caller sees once the executor gives up

use std::time::Duration;
use studio_diagnostics::ErrorDetails;

/// Invalid retry configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// At least one attempt is required
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    /// Multiplier below 1 or not finite
    #[error("backoff_multiplier must be a finite number >= 1, got {0}")]
    Multiplier(f64),

    /// Attempts need a non-zero budget
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Failure of one attempt
#[derive(Debug, thiserror::Error)]
pub enum AttemptError<E> {
    /// The attempt did not finish within the configured timeout
    #[error("Operation timed out after {}ms", .timeout.as_millis())]
    OperationTimeout { timeout: Duration },

    /// The operation returned an error
    #[error("{0}")]
    OperationFailure(#[source] E),
}

impl<E> AttemptError<E> {
    /// Check if the attempt timed out
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::OperationTimeout { .. })
    }

    /// The operation's own error, if it produced one
    #[inline]
    #[must_use]
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::OperationFailure(e) => Some(e),
            Self::OperationTimeout { .. } => None,
        }
    }
}

impl<E: std::error::Error> AttemptError<E> {
    /// Log representation: timeouts get their own kind, operation errors keep theirs
    #[must_use]
    pub fn details(&self) -> ErrorDetails {
        match self {
            Self::OperationTimeout { .. } => ErrorDetails::new("OperationTimeout", self.to_string()),
            Self::OperationFailure(e) => ErrorDetails::from_error(e),
        }
    }
}

/// Terminal executor error
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Configuration rejected before the first attempt
    #[error("invalid retry configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Every attempt failed
    #[error("Failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: AttemptError<E>,
    },

    /// The execution was cancelled from outside
    #[error("operation cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    /// Check if all attempts were used
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// Check if the execution was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Last attempt failure, when attempts were exhausted
    #[inline]
    #[must_use]
    pub fn last_attempt(&self) -> Option<&AttemptError<E>> {
        match self {
            Self::RetriesExhausted { last, .. } => Some(last),
            _ => None,
        }
    }

    /// Number of attempts that ran
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::InvalidConfig(_) => 0,
            Self::RetriesExhausted { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }
}
