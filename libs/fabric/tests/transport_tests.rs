use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use courier_core::outcome::{ACCESS_DENIED, REAUTHENTICATE};
use courier_core::{Outcome, ServiceTarget};
use courier_fabric::codec::JsonCodec;
use courier_fabric::error::Error;
use courier_fabric::request::{Method, Request};
use courier_fabric::transport::{HttpTransport, Transport};
use courier_fabric::{ClientConfig, Dispatcher};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Session {
    token: String,
}

/// Helper to get a free port
async fn get_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Read one HTTP/1.1 request (headers plus `content-length` body) as text
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8(buf).unwrap()
}

/// Serve a single request with a fixed response, returning the raw request
fn serve_once(listener: TcpListener, status: &'static str, body: &'static str) -> JoinHandle<String> {
    tokio::spawn(async move {
        let (mut stream, _addr) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.flush().await.unwrap();
        request
    })
}

fn dispatcher(addr: SocketAddr) -> Dispatcher<JsonCodec> {
    let config = ClientConfig {
        request_timeout_ms: Some(2_000),
        ..ClientConfig::new(format!("http://{addr}/"))
    };
    Dispatcher::from_config(&config).unwrap()
}

#[tokio::test]
async fn http_transport_returns_status_and_body() {
    let (listener, addr) = get_listener().await;
    let server = serve_once(listener, "418 I'm a teapot", "short and stout");

    let transport = HttpTransport::new().unwrap();
    let response = transport
        .send(Request::new(Method::Get, format!("http://{addr}/pot/brew")))
        .await
        .unwrap();

    assert_eq!(response.status, 418);
    assert_eq!(response.body, b"short and stout");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("GET /pot/brew HTTP/1.1\r\n"));
}

#[tokio::test]
async fn post_over_http_sends_body_and_service_key() {
    let (listener, addr) = get_listener().await;
    let server = serve_once(
        listener,
        "200 OK",
        r#"{"resultTag":"ok","payload":{"token":"xyz"}}"#,
    );

    let target = ServiceTarget::parse("users", "login")
        .unwrap()
        .with_service_key("k-123");
    let body = serde_json::json!({ "user": "a", "pass": "b" });
    let outcome: Outcome<Session> = dispatcher(addr).post(&target, &body).await;

    assert_eq!(
        outcome,
        Outcome::Success(Session {
            token: "xyz".into()
        })
    );

    let raw = server.await.unwrap();
    let lower = raw.to_ascii_lowercase();
    assert!(raw.starts_with("POST /users/login HTTP/1.1\r\n"));
    assert!(lower.contains("\r\nservice: k-123\r\n"));
    assert!(lower.contains("\r\ncontent-type: application/json"));
    assert!(raw.ends_with(r#"{"pass":"b","user":"a"}"#));
}

#[tokio::test]
async fn get_over_http_encodes_query() {
    let (listener, addr) = get_listener().await;
    let server = serve_once(listener, "200 OK", r#"{"resultTag":"ok","payload":3}"#);

    let target = ServiceTarget::parse("users", "count").unwrap();
    let outcome: Outcome<u32> = dispatcher(addr)
        .get(&target, [("role", "admin"), ("active", "true")])
        .await;

    assert_eq!(outcome, Outcome::Success(3));
    let raw = server.await.unwrap();
    assert!(raw.starts_with("GET /users/count?role=admin&active=true HTTP/1.1\r\n"));
}

#[tokio::test]
async fn forbidden_over_http_requires_reauthentication() {
    let (listener, addr) = get_listener().await;
    let _server = serve_once(listener, "403 Forbidden", "");

    let target = ServiceTarget::parse("users", "login").unwrap();
    let outcome: Outcome<Session> = dispatcher(addr).post(&target, &()).await;

    assert_eq!(outcome, Outcome::AccessDenied(vec![REAUTHENTICATE.into()]));
}

#[tokio::test]
async fn unauthorized_over_http_is_access_denied() {
    let (listener, addr) = get_listener().await;
    let _server = serve_once(listener, "401 Unauthorized", "");

    let target = ServiceTarget::parse("users", "profile").unwrap();
    let outcome: Outcome<Session> = dispatcher(addr).get(&target, Vec::<(String, String)>::new()).await;

    assert_eq!(outcome, Outcome::AccessDenied(vec![ACCESS_DENIED.into()]));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let (listener, addr) = get_listener().await;
    drop(listener);

    let target = ServiceTarget::parse("users", "login").unwrap();
    let outcome: Outcome<Session> = dispatcher(addr).post(&target, &()).await;

    assert!(matches!(outcome, Outcome::TransportError(_)));
}

#[tokio::test]
async fn request_timeout_fires() {
    let (listener, addr) = get_listener().await;

    // Spawn server that never responds
    tokio::spawn(async move {
        let (_stream, _addr) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let transport = HttpTransport::builder()
        .request_timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let result = transport
        .send(Request::new(Method::Get, format!("http://{addr}/slow/call")))
        .await;
    match result {
        Err(Error::Http(err)) => assert!(err.is_timeout()),
        other => panic!("Expected timeout error, got {other:?}"),
    }

    // The same failure through a dispatcher is an outcome, not an error
    let dispatcher = Dispatcher::new(format!("http://{addr}"), Arc::new(transport), JsonCodec);
    let target = ServiceTarget::parse("slow", "call").unwrap();
    let outcome: Outcome<Session> = dispatcher.post(&target, &()).await;
    assert!(matches!(outcome, Outcome::TransportError(_)));
}

#[test]
fn empty_base_url_is_rejected() {
    let err = Dispatcher::from_config(&ClientConfig::default())
        .err()
        .expect("config without base url");
    assert!(matches!(err, Error::InvalidConfig(_)));
}
