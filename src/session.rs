//! Chat session: one widget instance
//!
//! A [`ChatSession`] owns everything the widget mutates: the rate window,
//! the busy flag, the renderer and the display surface. Sessions share
//! nothing, so any number of them can run in one process.
//!
//! `handle_message` takes `&mut self`, which already rules out overlapping
//! sends on one session. The [`BusyFlag`] is still exposed so observers on
//! other tasks (a UI that greys out its send button) can see when a turn is
//! in flight, and so cloned handles can refuse input while busy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, MessagesConfig};
use crate::error::{Result, StreamchatError};
use crate::rate_limit::{Clock, RateLimiter, SystemClock};
use crate::renderer::StreamRenderer;
use crate::surface::DisplaySurface;
use crate::turn::{ChatTurn, TurnId, TurnState};

/// Shared, advisory "a turn is in flight" flag
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    /// A flag that starts idle
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a guard is currently held
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark busy, unless already busy
    ///
    /// The flag is released when the returned guard drops, whichever way
    /// the holder exits.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                flag: Arc::clone(&self.0),
            })
    }
}

/// Holds a [`BusyFlag`] until dropped
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// What happened to one send attempt
#[derive(Debug)]
pub enum SendOutcome {
    /// Input was blank after trimming; nothing rendered
    Empty,
    /// A turn was already in flight; input ignored
    Busy,
    /// The limiter rejected the send; `turn` shows the rejection message
    RateLimited {
        /// The rejection bubble
        turn: TurnId,
        /// Always `StreamchatError::RateLimitExceeded`
        error: StreamchatError,
    },
    /// The answer streamed to completion into `turn`
    Done {
        /// The answer bubble
        turn: TurnId,
    },
    /// The request failed; `turn` shows the error message
    Failed {
        /// The answer bubble, now showing the error message
        turn: TurnId,
        /// Why the turn failed
        error: StreamchatError,
    },
}

impl SendOutcome {
    /// Whether an answer was fully rendered
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// The incoming turn this attempt rendered, if any
    pub fn turn(&self) -> Option<TurnId> {
        match self {
            Self::RateLimited { turn, .. } | Self::Done { turn } | Self::Failed { turn, .. } => {
                Some(*turn)
            }
            Self::Empty | Self::Busy => None,
        }
    }

    /// The failure, for rate-limited and failed attempts
    pub fn error(&self) -> Option<&StreamchatError> {
        match self {
            Self::RateLimited { error, .. } | Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Consume the outcome, turning failures into an error
    ///
    /// # Errors
    ///
    /// Returns the turn's error for `RateLimited` and `Failed`, and a
    /// `StreamchatError::Config` for blank input
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Done { .. } | Self::Busy => Ok(()),
            Self::Empty => Err(StreamchatError::Config("message must not be empty".to_string()).into()),
            Self::RateLimited { error, .. } | Self::Failed { error, .. } => Err(error.into()),
        }
    }
}

/// One chat widget instance
pub struct ChatSession<S: DisplaySurface> {
    limiter: RateLimiter,
    renderer: StreamRenderer,
    surface: S,
    busy: BusyFlag,
    messages: MessagesConfig,
    loading_delay: Duration,
    last_state: TurnState,
}

impl<S: DisplaySurface> ChatSession<S> {
    /// Create a session and render the greeting onto `surface`
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint URL is invalid or the HTTP client
    /// cannot be built
    pub fn new(config: &Config, surface: S) -> Result<Self> {
        Self::with_clock(config, surface, Arc::new(SystemClock))
    }

    /// Like [`ChatSession::new`], with the rate window read from `clock`
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint URL is invalid or the HTTP client
    /// cannot be built
    pub fn with_clock(config: &Config, surface: S, clock: Arc<dyn Clock>) -> Result<Self> {
        let renderer = StreamRenderer::from_config(config)?;
        let limiter = RateLimiter::with_clock(config.rate_limit.max_messages_per_minute, clock);

        let mut session = Self {
            limiter,
            renderer,
            surface,
            busy: BusyFlag::new(),
            messages: config.messages.clone(),
            loading_delay: config.widget.loading_delay(),
            last_state: TurnState::Idle,
        };

        if !session.messages.initial.is_empty() {
            let greeting = ChatTurn::greeting(session.messages.initial.clone());
            let id = session.surface.push_turn(greeting);
            session.surface.finish_turn(id);
        }

        tracing::debug!(
            endpoint = %session.renderer.endpoint(),
            limit = session.limiter.limit(),
            "chat session ready"
        );
        Ok(session)
    }

    /// Handle one user send attempt
    ///
    /// Blank input and input arriving while busy are ignored. Otherwise the
    /// message is rendered, checked against the rate window, and (if
    /// admitted) sent after the loading delay, with the answer streamed into
    /// a new incoming turn. The busy flag is held for the whole attempt and
    /// released even if this future is dropped part way.
    pub async fn handle_message(&mut self, input: &str) -> SendOutcome {
        let query = input.trim();
        if query.is_empty() {
            return SendOutcome::Empty;
        }

        let Some(_guard) = self.busy.try_acquire() else {
            tracing::debug!("send ignored while a turn is in flight");
            return SendOutcome::Busy;
        };

        self.surface.push_turn(ChatTurn::outgoing(query));

        if let Err(error) = self.limiter.check_and_record(&self.messages.rate_limit_error) {
            tracing::warn!(limit = self.limiter.limit(), "send rejected by rate limiter");
            // No request went out, so no turn state to report
            self.last_state = TurnState::Idle;
            let turn = self
                .surface
                .push_turn(ChatTurn::incoming_error(self.messages.rate_limit_error.clone()));
            return SendOutcome::RateLimited { turn, error };
        }

        if !self.loading_delay.is_zero() {
            tokio::time::sleep(self.loading_delay).await;
        }

        let turn = self
            .surface
            .push_turn(ChatTurn::incoming(self.messages.thinking.clone()));
        let ctx = self.renderer.context(query);

        self.last_state = TurnState::Sent;
        let report = self.renderer.send(ctx, &mut self.surface, turn).await;
        self.last_state = report.state;

        match report.error {
            None => SendOutcome::Done { turn },
            Some(error) => SendOutcome::Failed { turn, error },
        }
    }

    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Handle to the busy flag, for observers on other tasks
    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// State the most recent turn reached
    pub fn last_state(&self) -> TurnState {
        self.last_state
    }

    /// The rate limiter, for status displays
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The renderer's endpoint and timeout
    pub fn renderer(&self) -> &StreamRenderer {
        &self.renderer
    }

    /// The display surface
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the display surface
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Tear down the session, keeping the surface
    pub fn into_surface(self) -> S {
        self.surface
    }
}

impl<S: DisplaySurface + std::fmt::Debug> std::fmt::Debug for ChatSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("limiter", &self.limiter)
            .field("renderer", &self.renderer)
            .field("busy", &self.busy.is_busy())
            .field("last_state", &self.last_state)
            .field("surface", &self.surface)
            .finish()
    }
}
