//! End-to-end tests against in-process fixture servers.
//!
//! Each fixture binds an ephemeral port, captures the raw request bytes
//! and serves a canned response, so every assertion runs without touching
//! the network.

use http::Method;
use replaynet::{Body, Client, CookieJar, ErrorKind, Form, ReqParams, StandardHeader};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Serve one connection: capture the request, write `response`, close.
async fn spawn_fixture(response: Vec<u8>) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(&response).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });
    (addr, handle)
}

/// Accept a connection and never answer it.
async fn spawn_black_hole() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    addr
}

async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(head_end) = find(&buffer, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buffer[..head_end]).to_ascii_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buffer.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    buffer
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn ok_response(content_type: &str, body: &[u8], extra_headers: &str) -> Vec<u8> {
    let mut wire = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n{extra_headers}Connection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    wire.extend_from_slice(body);
    wire
}

fn status_response(status_line: &str, body: &[u8]) -> Vec<u8> {
    let mut wire = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    wire.extend_from_slice(body);
    wire
}

fn relaxed() -> ReqParams {
    ReqParams::new().timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn request_line_and_headers_reach_the_server() {
    let (addr, captured) = spawn_fixture(ok_response("text/plain", b"ok", "")).await;
    let params = relaxed()
        .header(StandardHeader::Referer, "http://from.test/")
        .custom_header("X-Trace", "abc");

    let response = Client::new()
        .get_with(&format!("http://{addr}/hello?x=1"), params)
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text(), "ok");

    let request = String::from_utf8(captured.await.unwrap()).unwrap();
    assert!(request.starts_with("GET /hello?x=1 HTTP/1.1\r\n"));
    let head = request.to_ascii_lowercase();
    assert!(head.contains("\r\nx-trace: abc\r\n"));
    assert!(head.contains("\r\nreferer: http://from.test/\r\n"));
    assert!(head.contains(&format!("\r\nhost: {addr}\r\n")));
    // Defaults fill in what the caller left unset.
    assert!(head.contains("\r\nuser-agent: mozilla/5.0"));
    assert!(head.contains("\r\naccept-language:"));
}

#[tokio::test]
async fn get_query_params_append_after_the_existing_query() {
    let (addr, captured) = spawn_fixture(ok_response("text/plain", b"", "")).await;
    let params = relaxed().query_param("b", "2");

    Client::new()
        .get_with(&format!("http://{addr}/?a=1"), params)
        .await
        .unwrap();

    let request = String::from_utf8(captured.await.unwrap()).unwrap();
    assert!(request.starts_with("GET /?a=1&b=2 HTTP/1.1\r\n"));
}

#[tokio::test]
async fn post_sends_query_pairs_as_urlencoded_form() {
    let (addr, captured) = spawn_fixture(ok_response("text/plain", b"", "")).await;
    let params = relaxed().query_param("name", "brief case");

    Client::new()
        .post_with(&format!("http://{addr}/submit"), params)
        .await
        .unwrap();

    let request = String::from_utf8(captured.await.unwrap()).unwrap();
    let head = request.to_ascii_lowercase();
    assert!(head.contains("\r\ncontent-type: application/x-www-form-urlencoded;charset=utf-8\r\n"));
    assert!(request.ends_with("\r\n\r\nname=brief+case"));
}

#[tokio::test]
async fn post_json_body_round_trips() {
    let (addr, captured) = spawn_fixture(ok_response("application/json", b"{}", "")).await;
    let params = relaxed().body(Body::Json(serde_json::json!({"id": 7, "name": "x"})));

    Client::new()
        .post_with(&format!("http://{addr}/api"), params)
        .await
        .unwrap();

    let request = captured.await.unwrap();
    let body_start = find(&request, b"\r\n\r\n").unwrap() + 4;
    let sent: serde_json::Value = serde_json::from_slice(&request[body_start..]).unwrap();
    assert_eq!(sent, serde_json::json!({"id": 7, "name": "x"}));

    let head = String::from_utf8_lossy(&request).to_ascii_lowercase();
    assert!(head.contains("\r\ncontent-type: application/json;charset=utf-8\r\n"));
}

#[tokio::test]
async fn post_multipart_body_is_boundary_framed() {
    let (addr, captured) = spawn_fixture(ok_response("text/plain", b"", "")).await;
    let form = Form::new().text("field", "value");
    let boundary = form.boundary().to_string();
    let params = relaxed().body(Body::Multipart(form));

    Client::new()
        .post_with(&format!("http://{addr}/upload"), params)
        .await
        .unwrap();

    let request = String::from_utf8(captured.await.unwrap()).unwrap();
    let head = request.to_ascii_lowercase();
    assert!(head.contains(&format!(
        "\r\ncontent-type: multipart/form-data; boundary={boundary}\r\n"
    )));
    assert!(request.ends_with(&format!("--{boundary}--\r\n")));
}

#[tokio::test]
async fn suppressed_status_error_keeps_the_server_data() {
    let (addr, _captured) = spawn_fixture(status_response("404 Not Found", b"missing")).await;
    let params = relaxed().error_on_status(false);

    let response = Client::new()
        .get_with(&format!("http://{addr}/gone"), params)
        .await
        .unwrap();

    // Suppression disables escalation, not data capture.
    assert_eq!(response.status(), 404);
    assert_eq!(response.text(), "missing");
}

#[tokio::test]
async fn status_errors_escalate_by_default() {
    let (addr, _captured) =
        spawn_fixture(status_response("500 Internal Server Error", b"boom")).await;

    let err = Client::new()
        .get_with(&format!("http://{addr}/fail"), relaxed())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::HttpStatusCode);
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn timeout_returns_the_empty_response_within_the_bound() {
    let addr = spawn_black_hole().await;
    let params = ReqParams::new()
        .timeout(Duration::from_millis(50))
        .error_on_timeout(false);

    let started = Instant::now();
    let response = Client::new()
        .get_with(&format!("http://{addr}/stuck"), params)
        .await
        .unwrap();

    assert_eq!(response.status(), 0);
    assert!(response.bytes().is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn timeout_escalates_when_asked_to() {
    let addr = spawn_black_hole().await;
    let params = ReqParams::new().timeout(Duration::from_millis(50));

    let err = Client::new()
        .get_with(&format!("http://{addr}/stuck"), params)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RequestTimeout);
}

#[tokio::test]
async fn cancellation_wins_with_an_empty_response() {
    let addr = spawn_black_hole().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let response = Client::new()
        .request_cancelable(
            Method::GET,
            &format!("http://{addr}/never"),
            relaxed(),
            cancel,
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 0);
}

#[tokio::test]
async fn connection_refusal_is_a_request_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = Client::new()
        .get_with(&format!("http://{addr}/"), relaxed())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RequestError);
}

#[tokio::test]
async fn response_cookies_flow_into_the_next_request() {
    let jar = CookieJar::new();

    let (addr, _captured) = spawn_fixture(ok_response(
        "text/plain",
        b"logged in",
        "Set-Cookie: session=abc123; Path=/\r\n",
    ))
    .await;
    let response = Client::new()
        .get_with(
            &format!("http://{addr}/login"),
            relaxed().cookies(jar.clone()),
        )
        .await
        .unwrap();

    assert_eq!(response.cookies().get("session").as_deref(), Some("abc123"));

    // Both fixtures share 127.0.0.1, so the jar entry matches the second
    // request too.
    let (addr2, captured2) = spawn_fixture(ok_response("text/plain", b"", "")).await;
    Client::new()
        .get_with(&format!("http://{addr2}/account"), relaxed().cookies(jar))
        .await
        .unwrap();

    let request = String::from_utf8(captured2.await.unwrap()).unwrap();
    assert!(request
        .to_ascii_lowercase()
        .contains("\r\ncookie: session=abc123\r\n"));
}

#[tokio::test]
async fn html_meta_charset_overrides_the_transport_header() {
    let body = b"<html><head><meta charset=\"utf-8\"></head><body>ok</body></html>";

    let (addr, _) = spawn_fixture(ok_response("text/html; charset=gbk", body, "")).await;
    let sniffed = Client::new()
        .get_with(&format!("http://{addr}/"), relaxed())
        .await
        .unwrap();
    assert_eq!(sniffed.encoding().name(), "UTF-8");

    let (addr, _) = spawn_fixture(ok_response("text/html; charset=gbk", body, "")).await;
    let unsniffed = Client::new()
        .get_with(
            &format!("http://{addr}/"),
            relaxed().sniff_html_charset(false),
        )
        .await
        .unwrap();
    assert_eq!(unsniffed.encoding().name(), "GBK");
}

#[tokio::test]
async fn gbk_body_decodes_through_the_declared_charset() {
    let (body, _, _) = encoding_rs::GBK.encode("早上好");
    let (addr, _) = spawn_fixture(ok_response("text/plain; charset=gbk", &body, "")).await;

    let response = Client::new()
        .get_with(&format!("http://{addr}/"), relaxed())
        .await
        .unwrap();

    assert_eq!(response.encoding().name(), "GBK");
    assert_eq!(response.text(), "早上好");
}

#[tokio::test]
async fn channel_mode_routes_errors_and_returns_data() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let client = Client::builder()
        .on_error(move |err| sink.lock().unwrap().push(err.kind()))
        .build();

    // A status error in channel mode is notified, and the real response
    // still comes back.
    let (addr, _) = spawn_fixture(status_response("404 Not Found", b"missing")).await;
    let response = client
        .get_with(&format!("http://{addr}/gone"), relaxed())
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(response.text(), "missing");

    // A timeout in channel mode is notified with the empty response.
    let addr = spawn_black_hole().await;
    let response = client
        .get_with(
            &format!("http://{addr}/stuck"),
            ReqParams::new().timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 0);

    let kinds = seen.lock().unwrap().clone();
    assert_eq!(
        kinds,
        vec![ErrorKind::HttpStatusCode, ErrorKind::RequestTimeout]
    );
}

#[tokio::test]
async fn replayed_transcript_matches_the_capture() {
    let (addr, captured) = spawn_fixture(ok_response("text/plain", b"accepted", "")).await;
    let transcript = format!(
        "POST /submit HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Content-Type: application/x-www-form-urlencoded\r\n\
         X-Capture: yes\r\n\
         Content-Length: 7\r\n\r\n\
         a=1&b=2"
    );

    let response = Client::new()
        .replay_with(&transcript, relaxed())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text(), "accepted");

    let request = String::from_utf8(captured.await.unwrap()).unwrap();
    assert!(request.starts_with("POST /submit HTTP/1.1\r\n"));
    let head = request.to_ascii_lowercase();
    assert!(head.contains("\r\nx-capture: yes\r\n"));
    assert!(head.contains("\r\ncontent-type: application/x-www-form-urlencoded;charset=utf-8\r\n"));
    assert!(request.ends_with("\r\n\r\na=1&b=2"));
}

#[tokio::test]
async fn replayed_transcript_without_host_never_dispatches() {
    let err = Client::new()
        .replay("GET / HTTP/1.1\r\nAccept: */*\r\n\r\n")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UrlParse);
}
