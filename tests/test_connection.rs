//! End-to-end exchanges over real sockets.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fileserve::http::connection::{Connection, MAX_HEAD_BYTES};
use fileserve::http::resolver::DocRoot;
use fileserve::server::WorkerPool;
use fileserve::server::listener::serve;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const CLIENT_DEADLINE: Duration = Duration::from_secs(5);

fn www() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hello.txt"), b"hi").unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs/index.html"), b"<h1>docs</h1>").unwrap();
    dir
}

async fn start(root: &Path, read_timeout: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let root = Arc::new(DocRoot::new(root).unwrap());

    tokio::spawn(serve(listener, root, WorkerPool::new(4), read_timeout));
    addr
}

async fn read_all(stream: &mut TcpStream) -> Vec<u8> {
    let mut response = Vec::new();
    timeout(CLIENT_DEADLINE, stream.read_to_end(&mut response))
        .await
        .expect("server did not close the connection")
        .unwrap();
    response
}

async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    read_all(&mut stream).await
}

/// Splits a response into its head (status line + headers) and body.
fn split(response: &[u8]) -> (String, Vec<u8>) {
    let end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator");
    let head = String::from_utf8(response[..end].to_vec()).unwrap();
    (head, response[end + 4..].to_vec())
}

fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(": "))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

#[tokio::test]
async fn test_get_existing_file() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(addr, b"GET /hello.txt HTTP/1.1\r\n\r\n").await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header(&head, "Content-Length"), Some("2"));
    assert_eq!(header(&head, "Content-Type"), Some("text/plain"));
    assert_eq!(header(&head, "Connection"), Some("close"));
    assert!(header(&head, "Server").is_some());
    assert!(header(&head, "Date").unwrap().ends_with(" GMT"));
    assert_eq!(body, b"hi");
}

#[tokio::test]
async fn test_head_existing_file() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(addr, b"HEAD /hello.txt HTTP/1.1\r\n\r\n").await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header(&head, "Content-Length"), Some("2"));
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_get_binary_file_is_byte_identical() {
    let dir = www();
    let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(dir.path().join("blob.bin"), &data).unwrap();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(addr, b"GET /blob.bin HTTP/1.1\r\nHost: x\r\n\r\n").await;
    let (head, body) = split(&response);

    assert_eq!(header(&head, "Content-Length"), Some("100000"));
    assert_eq!(body, data);
}

#[tokio::test]
async fn test_directory_index() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(addr, b"GET /docs/ HTTP/1.1\r\n\r\n").await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header(&head, "Content-Type"), Some("text/html"));
    assert_eq!(body, b"<h1>docs</h1>");
}

#[tokio::test]
async fn test_encoded_path_and_query() {
    let dir = www();
    fs::write(dir.path().join("my file.txt"), b"spaced").unwrap();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(addr, b"GET /my%20file.txt?v=1 HTTP/1.1\r\n\r\n").await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"spaced");
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(addr, b"GET /nope.txt HTTP/1.1\r\n\r\n").await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(header(&head, "Content-Length"), Some("0"));
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_traversal_is_400() {
    let dir = www();
    // A file that the traversal would reach if dot segments were folded away
    fs::write(dir.path().join("secret"), b"top").unwrap();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let requests: [&[u8]; 5] = [
        b"GET /../secret HTTP/1.1\r\n\r\n",
        b"GET /%2e%2e/secret HTTP/1.1\r\n\r\n",
        b"GET /docs/%2E%2E%2F%2E%2E%2Fetc/passwd HTTP/1.1\r\n\r\n",
        b"GET http://h/../secret HTTP/1.1\r\n\r\n",
        b"GET http://h/%2e%2e/secret HTTP/1.1\r\n\r\n",
    ];

    for request in requests {
        let response = exchange(addr, request).await;
        let (head, body) = split(&response);

        assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{head}");
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn test_disallowed_method_is_405() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    for method in ["POST", "PUT", "DELETE", "OPTIONS"] {
        let request = format!("{} / HTTP/1.1\r\n\r\n", method);
        let response = exchange(addr, request.as_bytes()).await;
        let (head, body) = split(&response);

        assert!(head.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn test_malformed_request_line_is_400() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(addr, b"HELLO\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
}

#[tokio::test]
async fn test_absolute_form_target() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(addr, b"GET http://example.com/hello.txt HTTP/1.1\r\n\r\n").await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"hi");
}

#[tokio::test]
async fn test_non_utf8_request_head_is_400() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(addr, b"GET /\xff\xfe.txt HTTP/1.1\r\n\r\n").await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_oversized_head_is_answered_without_waiting_for_timeout() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(10)).await;

    // Exactly the cap, so nothing is left unread when the server closes
    let junk = vec![b'A'; MAX_HEAD_BYTES];

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let started = Instant::now();
    stream.write_all(&junk).await.unwrap();

    let response = read_all(&mut stream).await;

    assert!(response.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_request_split_across_writes() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /hel").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream.write_all(b"lo.txt HTTP/1.1\r\nHost: x\r").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream.write_all(b"\n\r\n").await.unwrap();

    let response = read_all(&mut stream).await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"hi");
}

#[tokio::test]
async fn test_silent_client_disconnect_closes_without_response() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.shutdown().await.unwrap();

    let started = Instant::now();
    let response = read_all(&mut stream).await;

    assert!(response.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_idle_client_is_closed_after_read_timeout() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_millis(200)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();

    let started = Instant::now();
    let response = read_all(&mut stream).await;

    assert!(response.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_partial_request_is_parsed_after_timeout() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_millis(200)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /hello.txt HTTP/1.1\r\n").await.unwrap();

    let response = read_all(&mut stream).await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"hi");
}

#[tokio::test]
async fn test_partial_request_is_parsed_after_peer_close() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"HEAD /hello.txt HTTP/1.1").await.unwrap();
    stream.shutdown().await.unwrap();

    let response = read_all(&mut stream).await;
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_keep_alive_is_ignored() {
    let dir = www();
    let addr = start(dir.path(), Duration::from_secs(5)).await;

    let response = exchange(
        addr,
        b"GET /hello.txt HTTP/1.1\r\nConnection: keep-alive\r\n\r\n",
    )
    .await;
    let (head, _) = split(&response);

    assert_eq!(header(&head, "Connection"), Some("close"));
}

#[tokio::test]
async fn test_connection_run_directly() {
    let dir = www();
    let root = Arc::new(DocRoot::new(dir.path()).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        Connection::new(socket, root, Duration::from_secs(5)).run().await
    });

    let response = exchange(addr, b"GET /hello.txt HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert!(server.await.unwrap().is_ok());
}
