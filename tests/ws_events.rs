//! End-to-end tests of the `/ws` event channel.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use std::time::Duration;

use common::{TestServer, future, iso};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(server: &TestServer, user_id: &str) -> Result<Socket, WsError> {
    let Ok(mut request) = format!("ws://{}/ws", server.addr).into_client_request() else {
        panic!("bad ws url");
    };
    let Ok(value) = HeaderValue::from_str(user_id) else {
        panic!("bad header");
    };
    request.headers_mut().insert("x-user-id", value);
    tokio_tungstenite::connect_async(request)
        .await
        .map(|(socket, _)| socket)
}

async fn next_json(socket: &mut Socket) -> Option<serde_json::Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .ok()??
            .ok()?;
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).ok();
        }
    }
}

#[tokio::test]
async fn doctor_receives_booking_and_notification_events() {
    let server = TestServer::start().await;
    let at = future(2);
    server.publish(&server.doctor, &[at]).await;

    let Ok(mut doctor_ws) = connect(&server, &server.doctor.id.to_string()).await else {
        panic!("doctor could not connect");
    };
    let Ok(mut student_ws) = connect(&server, &server.student.id.to_string()).await else {
        panic!("student could not connect");
    };

    let (status, _) = server.book(&server.student, &server.doctor, &iso(at)).await;
    assert_eq!(status, reqwest::StatusCode::CREATED);

    let mut seen = Vec::new();
    for _ in 0..2 {
        let Some(msg) = next_json(&mut doctor_ws).await else {
            panic!("doctor missed an event; got {seen:?}");
        };
        assert_eq!(msg["type"], "event");
        seen.push(msg["payload"]["event_type"].as_str().unwrap_or_default().to_string());
        if msg["payload"]["event_type"] == "appointment_booked" {
            assert_eq!(msg["payload"]["student_name"], "Asha Patel");
            assert!(msg["payload"].get("doctor_email").is_none());
        }
    }
    seen.sort();
    assert_eq!(seen, vec!["appointment_booked", "notification_created"]);

    // The student is not the recipient of either event.
    let quiet = tokio::time::timeout(Duration::from_millis(200), student_ws.next()).await;
    assert!(quiet.is_err(), "student received an event meant for the doctor");
}

#[tokio::test]
async fn unsubscribed_event_types_are_not_delivered() {
    let server = TestServer::start().await;
    let at = future(2);
    server.publish(&server.doctor, &[at]).await;

    let Ok(mut doctor_ws) = connect(&server, &server.doctor.id.to_string()).await else {
        panic!("doctor could not connect");
    };
    let command = serde_json::json!({
        "id": "mute-1",
        "type": "command",
        "timestamp": "2030-01-01T00:00:00Z",
        "payload": { "command": "unsubscribe", "event_types": ["notification_created"] }
    });
    let Ok(()) = doctor_ws.send(Message::text(command.to_string())).await else {
        panic!("send failed");
    };
    let Some(ack) = next_json(&mut doctor_ws).await else {
        panic!("no ack");
    };
    assert_eq!(ack["id"], "mute-1");

    let (status, _) = server.book(&server.student, &server.doctor, &iso(at)).await;
    assert_eq!(status, reqwest::StatusCode::CREATED);

    let Some(event) = next_json(&mut doctor_ws).await else {
        panic!("booking event missing");
    };
    assert_eq!(event["payload"]["event_type"], "appointment_booked");
    let quiet = tokio::time::timeout(Duration::from_millis(200), doctor_ws.next()).await;
    assert!(quiet.is_err(), "muted event type was delivered");
}

#[tokio::test]
async fn anonymous_upgrade_is_refused() {
    let server = TestServer::start().await;
    assert!(connect(&server, "not-a-number").await.is_err());
}
