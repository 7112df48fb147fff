use thiserror::Error;

/// Error types covering configuration, resource acquisition, and hardware writes.
///
/// Cancellation is deliberately not represented here: an operator stop is a
/// normal terminal transition of the loop, not a failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    /// Configuration or validation error. Fatal before the loop starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// A transport or pin could not be opened or configured. Fatal; the
    /// loop never starts.
    #[error("failed to acquire {resource}: {reason}")]
    Acquisition {
        /// Human-readable name of the resource (device path, GPIO number).
        resource: String,
        /// Underlying failure description.
        reason: String,
    },

    /// A single hardware write failed. Callers count and log this instead
    /// of propagating it, so the signaling cadence survives transients.
    #[error("write failed: {0}")]
    Write(String),

    /// Invalid loop state transition attempted.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state.
        from: String,
        /// Attempted target state.
        to: String,
    },
}

/// Convenience type alias for fallible operations.
pub type SignalResult<T> = Result<T, SignalError>;
