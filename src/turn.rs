//! Chat turns and the per-turn state machine
//!
//! A turn is one user message plus the lifecycle of its response. Every
//! rendered bubble is a [`ChatTurn`]; the response lifecycle is tracked by a
//! [`TurnState`] that only moves forward:
//!
//! ```text
//! Idle -> Sent -> Streaming -> Done
//!           \          \
//!            +-> Failed <+
//! ```

use std::fmt;

use crate::error::StreamchatError;

/// Which side of the conversation produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Typed by the user
    Outgoing,
    /// Produced by the endpoint, the limiter, or the greeting
    Incoming,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outgoing => write!(f, "outgoing"),
            Self::Incoming => write!(f, "incoming"),
        }
    }
}

/// Position of a turn on its display surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub usize);

/// One rendered chat bubble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Which side produced the turn
    pub role: Role,
    /// Text shown for the turn
    pub text: String,
    /// Whether the turn is rendered as an error
    pub is_error: bool,
    /// Whether `text` is light HTML (only the configured greeting is)
    pub is_markup: bool,
}

impl ChatTurn {
    /// A user message
    pub fn outgoing(text: impl Into<String>) -> Self {
        Self {
            role: Role::Outgoing,
            text: text.into(),
            is_error: false,
            is_markup: false,
        }
    }

    /// A response bubble, possibly a placeholder awaiting streamed text
    pub fn incoming(text: impl Into<String>) -> Self {
        Self {
            role: Role::Incoming,
            text: text.into(),
            is_error: false,
            is_markup: false,
        }
    }

    /// A response bubble rendered as an error from the start
    pub fn incoming_error(text: impl Into<String>) -> Self {
        Self {
            role: Role::Incoming,
            text: text.into(),
            is_error: true,
            is_markup: false,
        }
    }

    /// The configured greeting, which may carry `<br>` and similar markup
    pub fn greeting(text: impl Into<String>) -> Self {
        Self {
            is_markup: true,
            ..Self::incoming(text)
        }
    }
}

/// Lifecycle of one response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// No request issued yet
    #[default]
    Idle,
    /// Request issued, waiting for response headers
    Sent,
    /// Success headers received, body chunks arriving
    Streaming,
    /// Body ended normally
    Done,
    /// Terminal failure; the surface shows the error message
    Failed,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sent => write!(f, "sent"),
            Self::Streaming => write!(f, "streaming"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl TurnState {
    /// Whether no transition leaves this state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether a request is outstanding
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Sent | Self::Streaming)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: TurnState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Sent)
                | (Self::Sent, Self::Streaming)
                | (Self::Sent, Self::Failed)
                | (Self::Streaming, Self::Done)
                | (Self::Streaming, Self::Failed)
        )
    }

    /// Move to `next`, rejecting edges the state machine does not have
    ///
    /// # Errors
    ///
    /// Returns `StreamchatError::InvalidTransition` and leaves the state
    /// untouched if the edge is illegal.
    pub fn transition(&mut self, next: TurnState) -> std::result::Result<(), StreamchatError> {
        if !self.can_transition_to(next) {
            return Err(StreamchatError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        tracing::trace!(from = %self, to = %next, "turn transition");
        *self = next;
        Ok(())
    }

    /// Move to `Failed` from any non-terminal state other than `Idle`
    pub fn fail(&mut self) {
        if self.can_transition_to(Self::Failed) {
            *self = Self::Failed;
        }
    }
}
