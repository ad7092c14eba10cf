//! Integration tests for the WebSocket transport against a loopback server.
//!
//! These verify the pump end to end: frames encode onto the socket, inbound
//! text decodes back into frames, malformed frames and heartbeats are
//! dropped without costing the session, and a server close ends the inbound
//! stream cleanly.

#![cfg(feature = "transport")]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parley_client::transport;
use parley_proto::{Command, Frame};
use tokio::{net::TcpListener, time::timeout};
use tokio_tungstenite::tungstenite::Message;

async fn recv_frame(transport: &mut transport::Transport) -> Option<Frame> {
    timeout(Duration::from_secs(5), transport.from_server.recv())
        .await
        .expect("timed out waiting for frame")
}

#[tokio::test]
async fn frames_survive_the_pump_and_garbage_does_not() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

        let first = socket.next().await.unwrap().unwrap();
        let Message::Text(text) = first else { panic!("expected a text frame") };
        let frame = Frame::decode(&text).unwrap();
        assert_eq!(frame.command, Command::Connect);
        assert_eq!(frame.header("authorization"), Some("Bearer tok"));

        socket.send(Message::Text(Frame::new(Command::Connected).encode())).await.unwrap();

        // One good push, a heartbeat, garbage, then another good push. Only
        // the pushes may reach the client.
        let push = |body: &str| {
            Frame::new(Command::Message)
                .with_header("destination", "/topic/room.7")
                .with_body(body)
                .encode()
        };
        socket.send(Message::Text(push(r#"{"id":1}"#))).await.unwrap();
        socket.send(Message::Text("\n".to_string())).await.unwrap();
        socket.send(Message::Text("not a frame at all".to_string())).await.unwrap();
        socket.send(Message::Text(push(r#"{"id":2}"#))).await.unwrap();

        socket.close(None).await.unwrap();
    });

    let mut transport = transport::connect(&format!("ws://{addr}")).await.unwrap();
    transport.to_server.send(Frame::connect(Some("tok"))).await.unwrap();

    let connected = recv_frame(&mut transport).await.unwrap();
    assert_eq!(connected.command, Command::Connected);

    let m1 = recv_frame(&mut transport).await.unwrap();
    assert_eq!(m1.command, Command::Message);
    assert_eq!(m1.body, r#"{"id":1}"#);

    let m2 = recv_frame(&mut transport).await.unwrap();
    assert_eq!(m2.command, Command::Message);
    assert_eq!(m2.body, r#"{"id":2}"#);

    // Server closed: inbound stream ends.
    assert!(recv_frame(&mut transport).await.is_none());

    server.await.unwrap();
}

#[tokio::test]
async fn dropping_the_sender_closes_the_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

        // Wait for the client-initiated close.
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {},
                Some(Err(err)) => panic!("server socket error: {err}"),
            }
        }
    });

    let transport = transport::connect(&format!("ws://{addr}")).await.unwrap();
    drop(transport);

    timeout(Duration::from_secs(5), server).await.expect("server never saw the close").unwrap();
}

#[tokio::test]
async fn connect_fails_for_unreachable_server() {
    let result = transport::connect("ws://127.0.0.1:59997").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn stop_aborts_the_pump() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(_)) = socket.next().await {}
    });

    let transport = transport::connect(&format!("ws://{addr}")).await.unwrap();
    transport.stop();
}
