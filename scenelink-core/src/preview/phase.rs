//! Preview session lifecycle state machine.
//!
//! Provides a `SessionPhase` enum modelling the host's single preview
//! session, with validated transitions that return `Result` instead of
//! panicking.

use std::time::Instant;

use crate::error::LinkError;

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of the host's preview session.
///
/// ```text
///  Idle ──► Starting ──► Streaming
///   ▲          │             │
///   └──────────┴─────────────┘
/// ```
///
/// Only one session exists per host, so this is a property of the
/// host, not of any controller connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No preview activity. Initial / terminal state.
    #[default]
    Idle,

    /// Start accepted; binding the preview listener.
    Starting,

    /// Listener bound and the streamer is running.
    Streaming {
        /// When the session entered the `Streaming` state.
        since: Instant,
    },
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Starting => write!(f, "Starting"),
            Self::Streaming { .. } => write!(f, "Streaming"),
        }
    }
}

impl SessionPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming { .. })
    }

    /// How long the session has been streaming.
    ///
    /// Returns `None` for any other phase.
    pub fn streaming_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Streaming { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Starting`.
    ///
    /// Valid from: `Idle`. A start command that arrives in any other
    /// phase is rejected here, which is what makes a second start an
    /// error response rather than a second listener.
    pub fn begin_start(&mut self) -> Result<(), LinkError> {
        match self {
            Self::Idle => {
                *self = Self::Starting;
                Ok(())
            }
            _ => Err(LinkError::Session("cannot start: session not idle")),
        }
    }

    /// Transition to `Streaming`.
    ///
    /// Valid from: `Starting` (the listener bound successfully).
    pub fn begin_streaming(&mut self) -> Result<(), LinkError> {
        match self {
            Self::Starting => {
                *self = Self::Streaming {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(LinkError::Session("cannot stream: session not starting")),
        }
    }

    /// Transition to `Idle`.
    ///
    /// Valid from: `Starting` (bind failed), `Streaming` (stopped or
    /// last subscriber left).
    pub fn finish(&mut self) -> Result<(), LinkError> {
        match self {
            Self::Starting | Self::Streaming { .. } => {
                *self = Self::Idle;
                Ok(())
            }
            _ => Err(LinkError::Session("cannot finish: session already idle")),
        }
    }

    /// Force-reset to `Idle` regardless of current state.
    ///
    /// Use this when the streamer task dies unexpectedly.
    pub fn force_idle(&mut self) {
        *self = Self::Idle;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = SessionPhase::Idle;

        phase.begin_start().unwrap();
        assert_eq!(phase, SessionPhase::Starting);

        phase.begin_streaming().unwrap();
        assert!(phase.is_streaming());
        assert!(phase.streaming_duration().is_some());

        phase.finish().unwrap();
        assert!(phase.is_idle());
    }

    #[test]
    fn second_start_is_rejected() {
        let mut phase = SessionPhase::Streaming {
            since: Instant::now(),
        };
        assert!(phase.begin_start().is_err());

        let mut phase = SessionPhase::Starting;
        assert!(phase.begin_start().is_err());
    }

    #[test]
    fn streaming_requires_starting() {
        let mut phase = SessionPhase::Idle;
        assert!(phase.begin_streaming().is_err());
    }

    #[test]
    fn failed_bind_returns_to_idle() {
        let mut phase = SessionPhase::Starting;
        phase.finish().unwrap();
        assert!(phase.is_idle());
    }

    #[test]
    fn finish_when_idle_is_an_error() {
        let mut phase = SessionPhase::Idle;
        assert!(phase.finish().is_err());
    }

    #[test]
    fn force_idle_from_any_state() {
        let mut phase = SessionPhase::Streaming {
            since: Instant::now(),
        };
        phase.force_idle();
        assert!(phase.is_idle());
    }

    #[test]
    fn display_format() {
        assert_eq!(SessionPhase::Idle.to_string(), "Idle");
        assert_eq!(SessionPhase::Starting.to_string(), "Starting");
        assert_eq!(
            SessionPhase::Streaming {
                since: Instant::now()
            }
            .to_string(),
            "Streaming"
        );
    }

    #[test]
    fn default_phase_is_idle() {
        let phase = SessionPhase::default();
        assert!(phase.is_idle());
    }
}
