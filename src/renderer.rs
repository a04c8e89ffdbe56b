//! Stream renderer: one POST per user message, rendered as it arrives
//!
//! The renderer posts `{"query": ..., "history": []}` to the configured
//! endpoint and copies the chunked text body onto a display surface:
//!
//! - The deadline covers the request until response headers arrive. The
//!   same duration then bounds the idle gap between body chunks.
//! - A non-2xx status fails the turn without touching the body.
//! - Body bytes go through a [`Utf8StreamDecoder`] so characters split
//!   across chunks survive.
//! - The first piece of text replaces the placeholder, later pieces append.
//!   Streamed text is written as-is and never treated as markup.
//! - Any failure replaces the turn with the fixed error message. Nothing is
//!   retried.

use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::decoder::Utf8StreamDecoder;
use crate::error::{Result, StreamchatError};
use crate::surface::DisplaySurface;
use crate::turn::{TurnId, TurnState};

/// Everything one request needs, built fresh per send
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    query: String,
    history: Vec<serde_json::Value>,
    deadline: Duration,
}

impl RequestContext {
    /// Context for `query` with an empty history
    pub fn new(query: impl Into<String>, deadline: Duration) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
            deadline,
        }
    }

    /// The user's message
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Prior turns sent along; always empty
    pub fn history(&self) -> &[serde_json::Value] {
        &self.history
    }

    /// Deadline for headers and for each idle gap in the body
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// JSON request body
    pub fn body(&self) -> ChatRequestBody<'_> {
        ChatRequestBody {
            query: &self.query,
            history: &self.history,
        }
    }
}

/// Wire format of the POST body
#[derive(Debug, Serialize)]
pub struct ChatRequestBody<'a> {
    /// The user's message
    pub query: &'a str,
    /// Always serialized as `[]`
    pub history: &'a [serde_json::Value],
}

/// How a rendered turn ended
#[derive(Debug)]
pub struct TurnReport {
    /// `Done` or `Failed`
    pub state: TurnState,
    /// Why the turn failed, if it did
    pub error: Option<StreamchatError>,
}

impl TurnReport {
    /// Whether the body streamed to completion
    pub fn is_done(&self) -> bool {
        self.state == TurnState::Done
    }
}

/// Issues chat requests and streams the answers onto a surface
#[derive(Clone)]
pub struct StreamRenderer {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    strict_decoding: bool,
    error_message: String,
}

impl StreamRenderer {
    /// Create a renderer for `endpoint`
    ///
    /// No network I/O happens here. The client carries no overall request
    /// timeout: the deadline is enforced per phase by [`StreamRenderer::send`]
    /// so long answers can keep streaming.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StreamchatError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
            strict_decoding: false,
            error_message: crate::config::MessagesConfig::default().error,
        })
    }

    /// Create a renderer from the endpoint and message settings of `config`
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint URL is invalid
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.endpoint_url()?, config.endpoint.timeout())?
            .with_strict_decoding(config.endpoint.strict_decoding)
            .with_error_message(config.messages.error.clone()))
    }

    /// Fail on invalid UTF-8 instead of substituting U+FFFD
    pub fn with_strict_decoding(mut self, strict: bool) -> Self {
        self.strict_decoding = strict;
        self
    }

    /// Text shown in place of a failed answer
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Endpoint requests are posted to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fresh request context for `query`
    pub fn context(&self, query: impl Into<String>) -> RequestContext {
        RequestContext::new(query, self.timeout)
    }

    /// Run one turn: request, stream into `turn`, or render the error
    ///
    /// Never returns an error: failures are rendered on the surface and
    /// reported in the returned [`TurnReport`].
    pub async fn send<S>(&self, ctx: RequestContext, surface: &mut S, turn: TurnId) -> TurnReport
    where
        S: DisplaySurface + ?Sized,
    {
        let started = Instant::now();
        let mut state = TurnState::Idle;

        match self.stream_into(ctx, surface, turn, &mut state).await {
            Ok(()) => {
                surface.finish_turn(turn);
                tracing::debug!(
                    turn = turn.0,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "chat response complete"
                );
                TurnReport { state, error: None }
            }
            Err(error) => {
                state.fail();
                tracing::error!(turn = turn.0, error = %error, "chat request failed");
                surface.mark_error(turn, &self.error_message);
                TurnReport {
                    state,
                    error: Some(error),
                }
            }
        }
    }

    async fn stream_into<S>(
        &self,
        ctx: RequestContext,
        surface: &mut S,
        turn: TurnId,
        state: &mut TurnState,
    ) -> std::result::Result<(), StreamchatError>
    where
        S: DisplaySurface + ?Sized,
    {
        let deadline = ctx.deadline();
        let request = self.client.post(self.endpoint.clone()).json(&ctx.body());

        state.transition(TurnState::Sent)?;
        tracing::debug!(endpoint = %self.endpoint, query_len = ctx.query().len(), "posting chat request");

        let response = tokio::time::timeout(deadline, request.send())
            .await
            .map_err(|_| timeout_error(deadline))?
            .map_err(StreamchatError::from)?
            // Status check only; the body of a failed response is never read
            .error_for_status()
            .map_err(StreamchatError::from)?;

        state.transition(TurnState::Streaming)?;
        let decoder = if self.strict_decoding {
            Utf8StreamDecoder::strict()
        } else {
            Utf8StreamDecoder::new()
        };
        pump_body(response.bytes_stream(), decoder, surface, turn, deadline).await?;
        state.transition(TurnState::Done)
    }
}

impl fmt::Debug for StreamRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRenderer")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .field("strict_decoding", &self.strict_decoding)
            .finish()
    }
}

/// Copy a chunked body onto `turn`
///
/// Pulls chunks until the stream ends, decoding each with `decoder`. The
/// first non-empty text replaces the turn's placeholder and later text is
/// appended. If the whole body decodes to nothing the placeholder is
/// cleared. Waiting longer than `idle` for any chunk is a timeout.
///
/// # Errors
///
/// Returns `StreamchatError::Timeout` on an idle gap, and
/// `StreamchatError::Network` for a failed read or undecodable bytes.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use std::time::Duration;
/// use streamchat::renderer::pump_body;
/// use streamchat::{ChatTurn, DisplaySurface, Transcript, Utf8StreamDecoder};
///
/// # tokio_test::block_on(async {
/// let mut transcript = Transcript::new();
/// let turn = transcript.push_turn(ChatTurn::incoming("..."));
/// let body = futures::stream::iter(vec![
///     Ok::<_, std::io::Error>(Bytes::from_static(b"caf\xc3")),
///     Ok(Bytes::from_static(b"\xa9")),
/// ]);
/// pump_body(body, Utf8StreamDecoder::new(), &mut transcript, turn, Duration::from_secs(1))
///     .await
///     .unwrap();
/// assert_eq!(transcript.get(turn).unwrap().text, "café");
/// # });
/// ```
pub async fn pump_body<St, E, S>(
    body: St,
    mut decoder: Utf8StreamDecoder,
    surface: &mut S,
    turn: TurnId,
    idle: Duration,
) -> std::result::Result<(), StreamchatError>
where
    St: Stream<Item = std::result::Result<Bytes, E>>,
    E: fmt::Display,
    S: DisplaySurface + ?Sized,
{
    tokio::pin!(body);

    let mut wrote_any = false;
    let mut chunks = 0usize;
    let mut bytes = 0usize;

    loop {
        let next = tokio::time::timeout(idle, body.next())
            .await
            .map_err(|_| timeout_error(idle))?;
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| {
            StreamchatError::Network(format!("failed to read response body: {}", e))
        })?;
        chunks += 1;
        bytes += chunk.len();

        let text = decoder.decode(&chunk).map_err(decode_error)?;
        write_text(surface, turn, &text, &mut wrote_any);
    }

    let tail = decoder.finish().map_err(decode_error)?;
    write_text(surface, turn, &tail, &mut wrote_any);

    if !wrote_any {
        surface.replace_text(turn, "");
    }

    tracing::debug!(turn = turn.0, chunks, bytes, "response body drained");
    Ok(())
}

fn write_text<S>(surface: &mut S, turn: TurnId, text: &str, wrote_any: &mut bool)
where
    S: DisplaySurface + ?Sized,
{
    if text.is_empty() {
        return;
    }
    if *wrote_any {
        surface.append_text(turn, text);
    } else {
        surface.replace_text(turn, text);
        *wrote_any = true;
    }
}

fn timeout_error(deadline: Duration) -> StreamchatError {
    StreamchatError::Timeout {
        timeout_ms: deadline.as_millis() as u64,
    }
}

fn decode_error(err: crate::decoder::DecodeError) -> StreamchatError {
    StreamchatError::Network(format!("failed to decode response body: {}", err))
}
