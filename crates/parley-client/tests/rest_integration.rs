//! Integration tests for the REST client against a loopback HTTP server.
//!
//! Each test serves one canned HTTP/1.1 response from a raw TCP listener and
//! asserts both sides of the exchange: what the client put on the wire and
//! how it normalized the response.

use parley_client::{ChatApi, RestClient, RestConfig, RestError};
use parley_proto::{ProposalStatus, ProposeRequest};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

/// Serve exactly one canned response, returning the base URL and a handle
/// resolving to the raw request bytes.
async fn serve_once(response: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break request.len();
            }
            request.extend_from_slice(&buf[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        // Drain the body when the request declares one.
        let head = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while request.len() < header_end + content_length {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });

    (format!("http://{addr}"), handle)
}

fn json_response(status: u16, reason: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

async fn client_for(base_url: String, token: Option<&str>) -> RestClient {
    let config = RestConfig { base_url, ..RestConfig::default() };
    let mut client = RestClient::new(config).unwrap();
    client.set_token(token.map(str::to_owned));
    client
}

#[tokio::test]
async fn fetch_me_sends_bearer_and_reads_profile() {
    let body = r#"{"id": 42, "name": "Mira"}"#;
    let (base, request) = serve_once(json_response(200, "OK", body)).await;

    let client = client_for(base, Some("tok-1")).await;
    let profile = client.fetch_me().await.unwrap();

    assert_eq!(profile.id, Some(42));
    assert_eq!(profile.name.as_deref(), Some("Mira"));

    let raw = request.await.unwrap().to_lowercase();
    assert!(raw.starts_with("get /api/me"), "request line: {raw}");
    assert!(raw.contains("authorization: bearer tok-1"), "missing bearer header");
    assert!(raw.contains("accept: application/json"), "missing accept header");
}

#[tokio::test]
async fn api_error_surfaces_backend_message() {
    let body = r#"{"message": "forbidden room"}"#;
    let (base, _request) = serve_once(json_response(403, "Forbidden", body)).await;

    let client = client_for(base, Some("tok-1")).await;
    let err = client.fetch_history(9).await.unwrap_err();

    match err {
        RestError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "forbidden room");
        },
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn api_error_without_message_names_method_and_path() {
    let (base, _request) = serve_once(json_response(500, "Internal Server Error", "")).await;

    let client = client_for(base, None).await;
    let err = client.fetch_history(9).await.unwrap_err();

    match err {
        RestError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "GET /api/chat/rooms/9/messages -> 500");
        },
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_becomes_the_message() {
    let body = "gateway exploded";
    let response = format!(
        "HTTP/1.1 502 Bad Gateway\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let (base, _request) = serve_once(response).await;

    let client = client_for(base, None).await;
    let err = client.fetch_rooms().await.unwrap_err();

    match err {
        RestError::Api { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "gateway exploded");
        },
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_history_entries_are_skipped() {
    let body = r#"{"messages": [
        {"id": 1, "senderId": 5, "content": "hi"},
        {"content": "no id at all"},
        {"id": 3, "senderId": 6, "content": "still here"}
    ]}"#;
    let (base, _request) = serve_once(json_response(200, "OK", body)).await;

    let client = client_for(base, Some("tok-1")).await;
    let history = client.fetch_history(7).await.unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, "1");
    assert_eq!(history[1].id, "3");
}

#[tokio::test]
async fn history_with_wrong_shape_is_a_decode_error() {
    let (base, _request) = serve_once(json_response(200, "OK", r#""oops""#)).await;

    let client = client_for(base, Some("tok-1")).await;
    let err = client.fetch_history(7).await.unwrap_err();

    assert!(matches!(err, RestError::Decode { what: "history", .. }), "got {err:?}");
}

#[tokio::test]
async fn leave_room_treats_missing_room_as_left() {
    let body = r#"{"message": "room not found"}"#;
    let (base, request) = serve_once(json_response(404, "Not Found", body)).await;

    let client = client_for(base, Some("tok-1")).await;
    client.leave_room(31).await.unwrap();

    let raw = request.await.unwrap().to_lowercase();
    assert!(raw.starts_with("delete /api/chat/rooms/31/leave"), "request line: {raw}");
}

#[tokio::test]
async fn propose_sends_camel_case_payload() {
    let body = r#"{"proposalId": 7, "status": "PENDING"}"#;
    let (base, request) = serve_once(json_response(200, "OK", body)).await;

    let client = client_for(base, Some("tok-1")).await;
    let snapshot = client
        .propose(
            12,
            &ProposeRequest {
                target_user_id: 9,
                message: "Hello, I'd like to work together.".to_string(),
                talent_post_id: Some(3),
            },
        )
        .await
        .unwrap();

    assert_eq!(snapshot.proposal_id, Some(7));
    assert_eq!(snapshot.status, Some(ProposalStatus::Pending));

    let raw = request.await.unwrap();
    assert!(
        raw.to_lowercase().starts_with("post /api/chat/rooms/12/proposal"),
        "request line: {raw}"
    );
    assert!(raw.contains(r#""targetUserId":9"#), "payload: {raw}");
    assert!(raw.contains(r#""talentPostId":3"#), "payload: {raw}");
}
