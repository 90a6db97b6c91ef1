use std::future::Future;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use pimbridge::error::PimError;
use pimbridge::protocol::INVALID_MESSAGE_FORMAT;
use pimbridge::relay::{ChatRelay, Outcome, PromptRelay};
use pimbridge::store::SqliteStore;
use pimbridge::transport::{Connection, Readiness};

fn frozen() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap()
}

/// Serves `handler` for every socket opened on `/ws` and returns the url.
async fn backend<F, Fut>(handler: F) -> String
where
    F: Fn(WebSocket) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let app = Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade| {
            let handler = handler.clone();
            async move { ws.on_upgrade(handler) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

/// Answers every prompt with `reply` and reports every frame it receives.
async fn query_backend(reply: Value) -> (String, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let reply = reply.to_string();
    let url = backend(move |mut socket: WebSocket| {
        let tx = tx.clone();
        let reply = reply.clone();
        async move {
            while let Some(Ok(message)) = socket.recv().await {
                if let Message::Text(text) = message {
                    let frame: Value = serde_json::from_str(&text).unwrap();
                    if frame["type"] == "prompt" {
                        socket.send(Message::Text(reply.clone())).await.unwrap();
                    }
                    let _ = tx.send(frame);
                }
            }
        }
    })
    .await;
    (url, rx)
}

#[tokio::test]
async fn prompt_round_trip_sends_rows() {
    let store = SqliteStore::open_in_memory().unwrap();
    let day = 24 * 60 * 60 * 1000;
    store.add_event("Team events sync", frozen().timestamp_millis() + day, None, None, Some("Room 4")).unwrap();
    store.add_event("Lunch", frozen().timestamp_millis() + day, None, None, None).unwrap();

    let (url, mut frames) = query_backend(json!({
        "service": "calendar",
        "parameters": {
            "fields": ["title", "location"],
            "filter": "title LIKE ? AND start_date >= ?",
            "sort": "start_date ASC",
            "limit": 10
        }
    }))
    .await;

    let connection = Connection::connect(url);
    connection.await_ready().await.expect("connected");
    assert_eq!(connection.readiness(), Readiness::Open);

    let relay = PromptRelay::with_clock(&connection, Arc::new(store), frozen);
    let outcome = relay.process_prompt("events next week").await.expect("round trip");
    assert_eq!(outcome, Outcome::Sent { service: "calendar".into(), rows: 1 });

    let prompt = frames.recv().await.expect("prompt frame");
    assert_eq!(prompt, json!({"type": "prompt", "user_prompt": "events next week"}));
    let data = frames.recv().await.expect("data frame");
    assert_eq!(
        data,
        json!({"type": "data", "service": "calendar", "data": [{"title": "Team events sync", "location": "Room 4"}]})
    );
    connection.disconnect().await;
}

#[tokio::test]
async fn unknown_service_sends_nothing_back() {
    let (url, mut frames) = query_backend(json!({
        "service": "tasks",
        "parameters": {"fields": ["title"], "filter": "", "sort": "", "limit": 5}
    }))
    .await;
    let connection = Connection::connect(url);
    connection.await_ready().await.expect("connected");

    let relay = PromptRelay::new(&connection, Arc::new(SqliteStore::open_in_memory().unwrap()));
    let outcome = relay.process_prompt("my todo list").await.expect("round trip");
    assert_eq!(outcome, Outcome::NoData { service: "tasks".into() });

    assert_eq!(frames.recv().await.expect("prompt frame")["type"], "prompt");
    connection.disconnect().await;
    assert!(frames.try_recv().is_err(), "no data frame after the prompt");
}

#[tokio::test]
async fn invalid_field_surfaces_to_caller() {
    let (url, _frames) = query_backend(json!({
        "service": "calendar",
        "parameters": {"fields": ["attendees"], "filter": "", "sort": "", "limit": 5}
    }))
    .await;
    let connection = Connection::connect(url);
    connection.await_ready().await.expect("connected");
    let relay = PromptRelay::new(&connection, Arc::new(SqliteStore::open_in_memory().unwrap()));
    let err = relay.process_prompt("who is coming").await.unwrap_err();
    assert!(matches!(err, PimError::InvalidField { .. }), "got {err:?}");
    connection.disconnect().await;
}

#[tokio::test]
async fn malformed_reply_is_a_protocol_error() {
    let url = backend(|mut socket: WebSocket| async move {
        while let Some(Ok(Message::Text(_))) = socket.recv().await {
            socket.send(Message::Text("not json".into())).await.unwrap();
        }
    })
    .await;
    let connection = Connection::connect(url);
    connection.await_ready().await.expect("connected");
    let relay = PromptRelay::new(&connection, Arc::new(SqliteStore::open_in_memory().unwrap()));
    let err = relay.process_prompt("anything").await.unwrap_err();
    assert!(matches!(err, PimError::Protocol(_)), "got {err:?}");
    connection.disconnect().await;
}

#[tokio::test]
async fn only_one_request_in_flight() {
    // never answers
    let url = backend(|mut socket: WebSocket| async move { while socket.recv().await.is_some() {} }).await;
    let connection = Connection::connect(url);
    connection.await_ready().await.expect("connected");

    let mut first = Box::pin(connection.send_and_await_one_response("first".into()));
    assert!(futures_util::poll!(&mut first).is_pending());
    let err = connection.send_and_await_one_response("second".into()).await.unwrap_err();
    assert!(err.to_string().contains("already in flight"), "got {err}");
    drop(first);
    connection.disconnect().await;
}

#[tokio::test]
async fn pending_request_fails_when_server_closes() {
    let url = backend(|mut socket: WebSocket| async move {
        let _ = socket.recv().await;
        let _ = socket.close().await;
    })
    .await;
    let connection = Connection::connect(url);
    connection.await_ready().await.expect("connected");
    let err = connection.send_and_await_one_response("hello".into()).await.unwrap_err();
    assert!(matches!(err, PimError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn readiness_gate_reports_connect_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let connection = Connection::connect(format!("ws://{addr}/ws"));
    let err = connection.await_ready().await.unwrap_err();
    assert!(matches!(err, PimError::Transport(_)));
    assert!(matches!(connection.readiness(), Readiness::Failed(_)));
}

#[tokio::test]
async fn chat_relay_echo_and_garbage() {
    let url = backend(|mut socket: WebSocket| async move {
        while let Some(Ok(Message::Text(text))) = socket.recv().await {
            let frame: Value = serde_json::from_str(&text).unwrap();
            let echo = json!({"message": format!("echo: {}", frame["message"].as_str().unwrap()), "isSentByUser": false});
            socket.send(Message::Text(echo.to_string())).await.unwrap();
            socket.send(Message::Text("{oops".into())).await.unwrap();
        }
    })
    .await;
    let connection = Connection::connect(url);
    connection.await_ready().await.expect("connected");
    let mut incoming = connection.incoming().expect("first taker");
    assert!(connection.incoming().is_none(), "handed out once");

    let mut chat = ChatRelay::new(&connection);
    chat.send("hi there").await.expect("sent");

    let echoed = incoming.recv().await.expect("echo frame");
    assert_eq!(chat.receive(&echoed).text, "echo: hi there");
    let garbage = incoming.recv().await.expect("garbage frame");
    assert_eq!(chat.receive(&garbage).text, INVALID_MESSAGE_FORMAT);

    let history = chat.history();
    assert_eq!(history.len(), 3);
    assert!(history[0].is_sent_by_user);
    assert!(!history[1].is_sent_by_user && !history[2].is_sent_by_user);
    connection.disconnect().await;
}

#[tokio::test]
async fn uncorrelated_frames_are_dropped_until_someone_listens() {
    let url = backend(|mut socket: WebSocket| async move {
        while let Some(Ok(Message::Text(text))) = socket.recv().await {
            if text == "push" {
                socket.send(Message::Text("first".into())).await.unwrap();
                socket.send(Message::Text("second".into())).await.unwrap();
            } else {
                socket.send(Message::Text(format!("ack:{text}"))).await.unwrap();
            }
        }
    })
    .await;
    let connection = Connection::connect(url);
    connection.await_ready().await.expect("connected");

    let reply = connection.send_and_await_one_response("push".into()).await.expect("reply");
    assert_eq!(reply, "first");
    // Frames are ordered, so "second" has been handled by the time this answer arrives.
    let reply = connection.send_and_await_one_response("sync".into()).await.expect("reply");
    assert_eq!(reply, "ack:sync");

    let mut incoming = connection.incoming().expect("first taker");
    assert!(incoming.try_recv().is_err(), "nothing was queued without a listener");
    connection.send_fire_and_forget("push".into()).await.expect("sent");
    assert_eq!(incoming.recv().await.as_deref(), Some("first"));
    assert_eq!(incoming.recv().await.as_deref(), Some("second"));
    connection.disconnect().await;
}
