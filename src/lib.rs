//! streamchat - streaming chat widget library
//!
//! This library provides a chat component that sends each user message to an
//! HTTP endpoint and renders the answer incrementally as it streams back,
//! with client-side rate limiting and a small per-turn state machine.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: One widget instance; owns the limiter, renderer and surface
//! - `renderer`: Request building and the streaming response loop
//! - `decoder`: Incremental UTF-8 decoding across chunk boundaries
//! - `rate_limit`: Fixed-window send throttling
//! - `turn`: Chat turns and the turn state machine
//! - `surface`: Display surface trait and the in-memory transcript
//! - `terminal`: Colored terminal surface used by the CLI
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use streamchat::{ChatSession, Config, Transcript};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::default();
//!     config.endpoint.url = "http://localhost:8080/chat".to_string();
//!     config.validate()?;
//!
//!     let mut session = ChatSession::new(&config, Transcript::new())?;
//!     session.handle_message("What are your opening hours?").await.into_result()?;
//!
//!     for turn in session.surface().turns() {
//!         println!("{:?}: {}", turn.role, turn.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod decoder;
pub mod error;
pub mod markup;
pub mod rate_limit;
pub mod renderer;
pub mod session;
pub mod surface;
pub mod terminal;
pub mod theme;
pub mod turn;

// Re-export commonly used types
pub use config::Config;
pub use decoder::{DecodeError, Utf8StreamDecoder};
pub use error::{Result, StreamchatError};
pub use rate_limit::{Clock, ManualClock, RateLimiter, SystemClock};
pub use renderer::{RequestContext, StreamRenderer, TurnReport};
pub use session::{BusyFlag, ChatSession, SendOutcome};
pub use surface::{DisplaySurface, Transcript};
pub use terminal::TerminalSurface;
pub use turn::{ChatTurn, Role, TurnId, TurnState};
