use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_socket::{
    BackoffPolicy, ChatSession, SessionConfig, SessionUpdate, WebSocketConnector,
};
use chat_types::{AgentId, ConnectionStatus};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

const WAIT_LIMIT: Duration = Duration::from_secs(10);

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    (listener, format!("http://{addr}"))
}

fn session(base_url: &str) -> ChatSession {
    let config = SessionConfig::new(base_url).with_backoff(BackoffPolicy::new(
        Duration::from_millis(20),
        Duration::from_millis(50),
    ));
    ChatSession::new(config, Arc::new(WebSocketConnector::new()))
}

async fn wait_for_status(
    updates: &mut broadcast::Receiver<SessionUpdate>,
    expected: ConnectionStatus,
) {
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            if let Ok(SessionUpdate::StatusChanged { status, .. }) = updates.recv().await {
                if status == expected {
                    return;
                }
            }
        }
    })
    .await
    .expect("status never reached");
}

#[tokio::test]
async fn raw_frames_round_trip_through_a_real_socket() {
    let (listener, base_url) = bind().await;
    let seen_path = Arc::new(Mutex::new(String::new()));
    let server_path = Arc::clone(&seen_path);

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let callback = move |request: &Request, response: Response| {
            *server_path.lock().expect("path lock") = request.uri().path().to_owned();
            Ok::<Response, ErrorResponse>(response)
        };
        let mut socket = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .expect("server handshake");

        while let Some(Ok(message)) = socket.next().await {
            if let Message::Text(text) = message {
                assert_eq!(text, "hello");
                socket.send(Message::Text("Hi".into())).await.expect("send");
                socket.send(Message::Text(" there".into())).await.expect("send");
            }
        }
    });

    let mut session = session(&base_url);
    let mut updates = session.subscribe();
    session
        .open(Some(AgentId::new("A1")))
        .await
        .expect("open");
    wait_for_status(&mut updates, ConnectionStatus::Connected).await;

    session.send("hello").expect("send");
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            let messages = session.messages();
            if messages.len() == 2 && messages[1].content == "Hi there" {
                return;
            }
            let _ = updates.recv().await;
        }
    })
    .await
    .expect("assistant reply never arrived");

    assert_eq!(seen_path.lock().expect("path lock").as_str(), "/ws/A1");

    session.close().await;
    tokio::time::timeout(WAIT_LIMIT, server)
        .await
        .expect("server did not observe close")
        .expect("server task");
}

#[tokio::test]
async fn agent_not_found_close_code_stops_reconnecting() {
    let (listener, base_url) = bind().await;
    let accepted = Arc::new(AtomicUsize::new(0));
    let server_accepted = Arc::clone(&accepted);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            server_accepted.fetch_add(1, Ordering::SeqCst);
            let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            let frame = CloseFrame {
                code: CloseCode::from(4404),
                reason: "agent deleted".into(),
            };
            let _ = socket.close(Some(frame)).await;
        }
    });

    let mut session = session(&base_url);
    let mut updates = session.subscribe();
    session
        .open(Some(AgentId::new("gone")))
        .await
        .expect("open");
    wait_for_status(&mut updates, ConnectionStatus::Errored).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(session.status(), ConnectionStatus::Errored);
}

#[tokio::test]
async fn handshake_404_is_reported_as_agent_not_found() {
    let (listener, base_url) = bind().await;

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let reject = |_: &Request, _: Response| {
                let mut response = ErrorResponse::new(Some("Agent not found".to_owned()));
                *response.status_mut() = StatusCode::NOT_FOUND;
                Err(response)
            };
            let _ = tokio_tungstenite::accept_hdr_async(stream, reject).await;
        }
    });

    let mut session = session(&base_url);
    let mut updates = session.subscribe();
    session
        .open(Some(AgentId::new("missing")))
        .await
        .expect("open");
    wait_for_status(&mut updates, ConnectionStatus::Errored).await;

    let reason = session.status_reason().expect("reason");
    assert!(reason.contains("HTTP 404"), "{reason}");
}

#[tokio::test]
async fn refused_connection_schedules_retries() {
    let (listener, base_url) = bind().await;
    drop(listener);

    let mut session = session(&base_url);
    let mut updates = session.subscribe();
    session
        .open(Some(AgentId::new("A1")))
        .await
        .expect("open");

    wait_for_status(&mut updates, ConnectionStatus::Reconnecting).await;
    session.close().await;
    assert_eq!(session.status(), ConnectionStatus::Idle);
}
