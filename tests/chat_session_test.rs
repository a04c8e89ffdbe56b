//! Chat session integration tests
//!
//! Drives `ChatSession` against a `wiremock` server standing in for the
//! answer endpoint. wiremock sends each body in one piece, so chunk-boundary
//! decoding is covered by the renderer's unit tests instead.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use streamchat::{
    ChatSession, ManualClock, SendOutcome, StreamchatError, TerminalSurface, Transcript,
    TurnState,
};

mod common;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn mount_answer(server: &MockServer, query: &str, answer: &str) {
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "query": query, "history": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_string(answer))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Successful turns
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_answer_streams_into_new_turn() {
    let server = MockServer::start().await;
    mount_answer(&server, "opening hours?", "We open at 9am ☕").await;

    let config = common::config_for(&server.uri(), 2000);
    let mut session = ChatSession::new(&config, Transcript::new()).unwrap();

    let outcome = session.handle_message("  opening hours?  ").await;
    let turn = outcome.turn().expect("answer turn");
    assert!(outcome.is_done(), "unexpected outcome: {:?}", outcome);

    let transcript = session.surface();
    // greeting, outgoing, answer
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript.turns()[1].text, "opening hours?");
    let answer = transcript.get(turn).unwrap();
    assert_eq!(answer.text, "We open at 9am ☕");
    assert!(!answer.is_error);
    assert_eq!(session.last_state(), TurnState::Done);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_consecutive_sends_carry_empty_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(2)
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri(), 2000);
    let mut session = ChatSession::new(&config, Transcript::new()).unwrap();

    assert!(session.handle_message("first").await.is_done());
    assert!(session.handle_message("second").await.is_done());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let bodies: Vec<serde_json::Value> = requests
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(bodies[0], json!({ "query": "first", "history": [] }));
    assert_eq!(bodies[1], json!({ "query": "second", "history": [] }));
}

#[tokio::test]
async fn test_empty_body_clears_thinking_placeholder() {
    let server = MockServer::start().await;
    mount_answer(&server, "hello", "").await;

    let mut config = common::config_for(&server.uri(), 2000);
    config.messages.thinking = "Thinking...".to_string();
    let mut session = ChatSession::new(&config, Transcript::new()).unwrap();

    let outcome = session.handle_message("hello").await;
    assert!(outcome.is_done());
    let answer = session.surface().get(outcome.turn().unwrap()).unwrap();
    assert_eq!(answer.text, "");
    assert!(!answer.is_error);
}

#[tokio::test]
async fn test_terminal_surface_prints_answer() {
    colored::control::set_override(false);
    let server = MockServer::start().await;
    mount_answer(&server, "hello", "Hi! How can I help?").await;

    let mut config = common::config_for(&server.uri(), 2000);
    config.messages.initial.clear();
    let theme = streamchat::theme::Theme::from_config(&config.theme).unwrap();
    let surface = TerminalSurface::new(Vec::new(), theme, "Yuge Roast");
    let mut session = ChatSession::new(&config, surface).unwrap();

    assert!(session.handle_message("hello").await.is_done());

    let printed = String::from_utf8(session.into_surface().writer().clone()).unwrap();
    assert!(printed.contains(" Yuge Roast "));
    assert!(printed.ends_with("Hi! How can I help?\n"));
}

// ---------------------------------------------------------------------------
// Failed turns
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_slow_endpoint_times_out_and_releases_busy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri(), 100);
    let mut session = ChatSession::new(&config, Transcript::new()).unwrap();

    let outcome = session.handle_message("hello").await;
    assert!(matches!(
        outcome.error(),
        Some(StreamchatError::Timeout { timeout_ms: 100 })
    ));

    let answer = session.surface().get(outcome.turn().unwrap()).unwrap();
    assert!(answer.is_error);
    assert_eq!(answer.text, config.messages.error);
    assert_eq!(session.last_state(), TurnState::Failed);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_server_error_fails_without_rendering_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("stack trace: secret"))
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri(), 2000);
    let mut session = ChatSession::new(&config, Transcript::new()).unwrap();

    let outcome = session.handle_message("hello").await;
    assert!(matches!(
        outcome.error(),
        Some(StreamchatError::HttpStatus { status: 500 })
    ));
    assert!(session
        .surface()
        .turns()
        .iter()
        .all(|t| !t.text.contains("secret")));
    assert_eq!(
        session.surface().get(outcome.turn().unwrap()).unwrap().text,
        config.messages.error
    );
    assert_eq!(session.last_state(), TurnState::Failed);
}

#[tokio::test]
async fn test_not_found_is_http_error() {
    let server = MockServer::start().await;
    // Nothing mounted: wiremock answers 404

    let config = common::config_for(&server.uri(), 2000);
    let mut session = ChatSession::new(&config, Transcript::new()).unwrap();

    let outcome = session.handle_message("hello").await;
    assert!(matches!(
        outcome,
        SendOutcome::Failed {
            error: StreamchatError::HttpStatus { status: 404 },
            ..
        }
    ));
}

#[tokio::test]
async fn test_session_usable_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("back again"))
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri(), 2000);
    let mut session = ChatSession::new(&config, Transcript::new()).unwrap();

    assert!(!session.handle_message("one").await.is_done());
    let outcome = session.handle_message("two").await;
    assert!(outcome.is_done());
    assert_eq!(
        session.surface().get(outcome.turn().unwrap()).unwrap().text,
        "back again"
    );
}

#[tokio::test]
async fn test_dropped_send_releases_busy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = common::config_for(&server.uri(), 5000);
    let mut session = ChatSession::new(&config, Transcript::new()).unwrap();
    let busy = session.busy_flag();

    let cancelled =
        tokio::time::timeout(Duration::from_millis(100), session.handle_message("hello")).await;
    assert!(cancelled.is_err());
    assert!(!busy.is_busy());
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_rate_limit_blocks_until_window_passes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = common::config_for(&server.uri(), 2000);
    config.rate_limit.max_messages_per_minute = 2;
    let clock = ManualClock::new();
    let mut session =
        ChatSession::with_clock(&config, Transcript::new(), Arc::new(clock.clone())).unwrap();

    assert!(session.handle_message("one").await.is_done());
    assert!(session.handle_message("two").await.is_done());

    let blocked = session.handle_message("three").await;
    let rejection = session.surface().get(blocked.turn().unwrap()).unwrap();
    assert!(rejection.is_error);
    assert_eq!(rejection.text, config.messages.rate_limit_error);
    assert!(matches!(
        blocked,
        SendOutcome::RateLimited {
            error: StreamchatError::RateLimitExceeded { limit: 2, .. },
            ..
        }
    ));
    // Rejected attempts still show what the user typed
    assert_eq!(session.surface().outgoing().count(), 3);

    // Rejections do not extend the window
    clock.advance(Duration::from_millis(30_000));
    assert!(!session.handle_message("four").await.is_done());
    clock.advance(Duration::from_millis(30_001));
    assert!(session.handle_message("five").await.is_done());

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
