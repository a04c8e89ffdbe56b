//! Fixed-window rate limiter for user sends
//!
//! Counts admitted messages in a 60 second window that opens lazily on the
//! first check. When a check lands more than a full window after the window
//! opened, the count resets and a new window opens at that instant.
//!
//! Bursts straddling a boundary can reach twice the nominal rate. That is
//! accepted for abuse mitigation of a chat input.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::StreamchatError;

/// Length of one counting window
pub const WINDOW: Duration = Duration::from_millis(60_000);

/// Source of "now" for the limiter
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same offset, so a test can keep one handle and give
/// another to a session.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

/// The currently open counting window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// When the window opened
    pub window_start: Instant,
    /// Admitted messages counted in this window
    pub message_count: u32,
}

/// Fixed-window limiter
///
/// `admit` only decides; `record` counts. Callers record admitted sends
/// only, so rejections never count against the limit.
pub struct RateLimiter {
    limit: u32,
    window: Option<RateWindow>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter on the system clock
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum admitted messages per window
    pub fn new(limit: u32) -> Self {
        Self::with_clock(limit, Arc::new(SystemClock))
    }

    /// Create a limiter reading time from `clock`
    pub fn with_clock(limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window: None,
            clock,
        }
    }

    /// Configured limit
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// The open window, if any check has happened yet
    pub fn window(&self) -> Option<RateWindow> {
        self.window
    }

    /// Decide whether one more send is allowed right now
    ///
    /// Opens the window on first use and rolls it over once more than
    /// [`WINDOW`] has elapsed since it opened. Does not count the send.
    pub fn admit(&mut self) -> bool {
        let now = self.clock.now();
        let count = self.roll(now).message_count;
        let admitted = count < self.limit;
        if !admitted {
            tracing::debug!(
                limit = self.limit,
                count,
                "rate limit reached for current window"
            );
        }
        admitted
    }

    /// Count one admitted send against the open window
    pub fn record(&mut self) {
        let now = self.clock.now();
        let window = self.roll(now);
        window.message_count = window.message_count.saturating_add(1);
    }

    /// `admit` followed by `record`, as a `Result`
    ///
    /// # Errors
    ///
    /// Returns `StreamchatError::RateLimitExceeded` carrying `message` when
    /// the send is rejected; nothing is counted in that case.
    pub fn check_and_record(&mut self, message: &str) -> std::result::Result<(), StreamchatError> {
        if !self.admit() {
            return Err(StreamchatError::RateLimitExceeded {
                limit: self.limit,
                message: message.to_string(),
            });
        }
        self.record();
        Ok(())
    }

    /// Sends the current window still admits
    pub fn remaining(&self) -> u32 {
        let now = self.clock.now();
        match self.window {
            Some(w) if now.saturating_duration_since(w.window_start) <= WINDOW => {
                self.limit.saturating_sub(w.message_count)
            }
            _ => self.limit,
        }
    }

    fn roll(&mut self, now: Instant) -> &mut RateWindow {
        let expired = self
            .window
            .map(|w| now.saturating_duration_since(w.window_start) > WINDOW)
            .unwrap_or(false);
        if expired {
            tracing::trace!("rate window elapsed, resetting count");
            self.window = None;
        }
        self.window.get_or_insert(RateWindow {
            window_start: now,
            message_count: 0,
        })
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish()
    }
}
