//! Interaction endpoint tests against a served client
//!
//! The platform API is an httpmock server, so REST callbacks and follow-ups
//! are observable without network access.
//!
//! Run with: cargo test -p integration-tests --test http_tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use httpmock::prelude::*;
use integration_tests::{
    assert_json, assert_status, command, component, message, ping, sign, subcommand, test_config,
    wait_for_count, TestServer, APPLICATION_ID, INTERACTION_TOKEN, TIMESTAMP,
};
use itx_client::model::{Command, MessageData};
use itx_client::{command_handler, component_handler, CommandEntry, HttpClient};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::mpsc;

const DEADLINE: Duration = Duration::from_millis(300);

fn bot(platform: &MockServer) -> HttpClient {
    HttpClient::new(test_config(platform, DEADLINE)).expect("client should build")
}

// ============================================================================
// Front door
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_ping_is_answered_with_pong() {
    let platform = MockServer::start();
    let server = TestServer::start(bot(&platform)).await.unwrap();

    let response = server.post_signed(&ping()).await.unwrap();
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    assert_eq!(response.text().await.unwrap(), r#"{"type":1}"#);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bad_signature_is_rejected() {
    let platform = MockServer::start();
    let server = TestServer::start(bot(&platform)).await.unwrap();

    let body = ping().to_string();
    let signature = sign(TIMESTAMP, &body.replace('1', "2"));
    let response = server.post_with_signature(&body, &signature).await.unwrap();

    let error: Value = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(error["error"]["code"], "INVALID_SIGNATURE");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_check() {
    let platform = MockServer::start();
    let server = TestServer::start(bot(&platform)).await.unwrap();

    let response = server.get("/health").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
    server.shutdown().await.unwrap();
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_fast_reply_is_the_http_response() {
    let platform = MockServer::start();
    let callback = platform.mock(|when, then| {
        when.method(POST);
        then.status(204);
    });
    let bot = bot(&platform);
    bot.registry()
        .register_command(CommandEntry::new(
            Command::new("hello", "Say hi"),
            command_handler(|ctx| async move {
                ctx.send_reply("hi", false).await.unwrap();
            }),
        ))
        .unwrap();
    let server = TestServer::start(bot).await.unwrap();

    let response = server.post_signed(&command(11, "hello")).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(body, json!({"type": 4, "data": {"content": "hi"}}));
    assert_eq!(callback.calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_handler_gets_no_content_then_follows_up() {
    let platform = MockServer::start();
    let follow_up = platform.mock(|when, then| {
        when.method(POST)
            .path(format!("/webhooks/{APPLICATION_ID}/{INTERACTION_TOKEN}"))
            .json_body(json!({"content": "finally"}));
        then.status(200).json_body(message(77, "finally"));
    });
    let bot = bot(&platform);
    bot.registry()
        .register_command(CommandEntry::new(
            Command::new("slow", "Takes a while"),
            command_handler(|ctx| async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let sent = ctx.send_follow_up(MessageData::text("finally")).await.unwrap();
                assert_eq!(sent.content, "finally");
            }),
        ))
        .unwrap();
    let server = TestServer::start(bot).await.unwrap();

    let started = Instant::now();
    let response = server.post_signed(&command(12, "slow")).await.unwrap();
    let elapsed = started.elapsed();

    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();
    assert!(elapsed >= DEADLINE, "answered after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "answered after {elapsed:?}");
    assert_eq!(follow_up.calls(), 0);

    let calls = wait_for_count(1, Duration::from_secs(5), || follow_up.calls()).await;
    assert_eq!(calls, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_late_initial_reply_goes_through_callback() {
    let platform = MockServer::start();
    let callback = platform.mock(|when, then| {
        when.method(POST)
            .path(format!("/interactions/13/{INTERACTION_TOKEN}/callback"))
            .json_body(json!({"type": 4, "data": {"content": "late"}}));
        then.status(204);
    });
    let bot = bot(&platform);
    bot.registry()
        .register_command(CommandEntry::new(
            Command::new("late", "Replies after the deadline"),
            command_handler(|ctx| async move {
                tokio::time::sleep(Duration::from_millis(600)).await;
                ctx.send_reply("late", false).await.unwrap();
            }),
        ))
        .unwrap();
    let server = TestServer::start(bot).await.unwrap();

    let response = server.post_signed(&command(13, "late")).await.unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let calls = wait_for_count(1, Duration::from_secs(5), || callback.calls()).await;
    assert_eq!(calls, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subcommand_reaches_its_own_handler() {
    let platform = MockServer::start();
    let bot = bot(&platform);
    let (names_tx, mut names) = mpsc::unbounded_channel();

    bot.registry()
        .register_command(CommandEntry::new(
            Command::new("runtime", "Runtime information"),
            command_handler(|ctx| async move {
                ctx.send_reply("parent", false).await.unwrap();
            }),
        ))
        .unwrap();
    bot.registry()
        .register_subcommand(
            CommandEntry::new(
                Command::new("stats", "Runtime statistics"),
                command_handler(move |ctx| {
                    let names_tx = names_tx.clone();
                    async move {
                        let verbose = ctx.option_value("verbose").cloned();
                        let _ = names_tx.send((ctx.name().to_string(), verbose));
                        ctx.send_reply("stats", false).await.unwrap();
                    }
                }),
            ),
            "runtime",
        )
        .unwrap();
    let server = TestServer::start(bot).await.unwrap();

    let interaction = subcommand(
        14,
        "runtime",
        "stats",
        json!([{"name": "verbose", "type": 5, "value": true}]),
    );
    let response = server.post_signed(&interaction).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(body["data"]["content"], "stats");
    let (name, verbose) = names.recv().await.unwrap();
    assert_eq!(name, "runtime@stats");
    assert_eq!(verbose, Some(json!(true)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_command_gets_ephemeral_notice() {
    let platform = MockServer::start();
    let server = TestServer::start(bot(&platform)).await.unwrap();

    let response = server.post_signed(&command(15, "missing")).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(body["type"], 4);
    assert_eq!(body["data"]["flags"], 64);
}

// ============================================================================
// Components
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_dynamic_waiter_then_fallback() {
    let platform = MockServer::start();
    let bot = bot(&platform).with_component_handler(component_handler(|ctx| async move {
        ctx.send_reply(format!("fallback for {}", ctx.custom_id()), true)
            .await
            .unwrap();
    }));
    let registry = Arc::clone(bot.registry());
    let server = TestServer::start(bot).await.unwrap();

    let mut waiter = registry.await_component(["btn-1"]).unwrap();

    let response = server.post_signed(&component(16, "btn-1")).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body, json!({"type": 6}));

    let click = tokio::time::timeout(Duration::from_secs(5), waiter.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(click.custom_id(), "btn-1");
    assert_eq!(click.id().to_string(), "16");

    waiter.cleanup();
    assert!(waiter.recv().await.is_none());
    assert!(!registry.has_component_waiter("btn-1"));

    let response = server.post_signed(&component(17, "btn-1")).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["data"]["content"], "fallback for btn-1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unclaimed_component_answers_no_content() {
    let platform = MockServer::start();
    let server = TestServer::start(bot(&platform)).await.unwrap();

    let response = server.post_signed(&component(18, "nobody")).await.unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();
}
