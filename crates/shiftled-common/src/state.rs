//! Loop lifecycle state machine.
//!
//! The signal loop moves through a fixed lifecycle:
//! IDLE → RUNNING → STOPPING → STOPPED
//!
//! STOPPING is the window where the in-flight tick has completed and
//! acquired resources are being released.

use crate::error::{SignalError, SignalResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of the signal loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopState {
    /// Constructed, not yet started.
    #[default]
    Idle,
    /// Periodic trigger armed; ticks executing.
    Running,
    /// Cancellation observed; releasing resources.
    Stopping,
    /// Terminal state; all resources released.
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Running => write!(f, "RUNNING"),
            Self::Stopping => write!(f, "STOPPING"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

impl LoopState {
    /// Check if a transition to `target` is valid from the current state.
    #[must_use]
    pub fn can_transition_to(&self, target: LoopState) -> bool {
        use LoopState::{Idle, Running, Stopped, Stopping};

        matches!(
            (self, target),
            // Normal forward progression
            (Idle, Running) | (Running, Stopping) | (Stopping, Stopped)
            // A loop that never started can stop directly
            | (Idle, Stopped)
        )
    }

    /// Returns true if the loop is executing ticks.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if the loop has reached its terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// State machine wrapper with transition tracking.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    current: LoopState,
    previous: Option<LoopState>,
    transition_count: u64,
}

impl StateMachine {
    /// Create a new state machine starting in IDLE.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.current
    }

    /// Get the previous state (if any transition occurred).
    #[must_use]
    pub fn previous_state(&self) -> Option<LoopState> {
        self.previous
    }

    /// Get total number of transitions.
    #[must_use]
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Attempt a state transition.
    pub fn transition(&mut self, target: LoopState) -> SignalResult<()> {
        if self.current.can_transition_to(target) {
            self.previous = Some(self.current);
            self.current = target;
            self.transition_count += 1;
            Ok(())
        } else {
            Err(SignalError::InvalidStateTransition {
                from: self.current.to_string(),
                to: target.to_string(),
            })
        }
    }
}
