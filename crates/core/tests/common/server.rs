//! Loopback HTTP server speaking just enough HTTP/1.1 for the client tests.
//!
//! Each route answers with a scripted [`Reply`]; every request is recorded so
//! tests can inspect what the client sent.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

/// Scripted answer for one route.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Reply {
    /// A complete JSON response.
    Json { status: u16, body: String },
    /// A response with `Content-Length: 0`.
    Empty { status: u16 },
    /// A chunked body, one HTTP chunk per entry, then a clean end.
    Stream { chunks: Vec<String>, delay: Duration },
    /// A chunked body cut off without its terminating chunk.
    StreamThenDrop { chunks: Vec<String> },
    /// A chunked body that never ends; the server waits for the client to leave.
    StreamThenHold { chunks: Vec<String> },
}

/// A request as received by the server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[allow(dead_code)]
impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Request body is not JSON")
    }
}

pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    disconnected: Arc<Notify>,
}

#[allow(dead_code)]
impl MockServer {
    /// Start a server answering `routes`, keyed by `"METHOD /path"`.
    ///
    /// Unknown routes get a 404.
    pub async fn start(routes: Vec<(&str, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind loopback listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        let routes: Arc<Vec<(String, Reply)>> = Arc::new(
            routes
                .into_iter()
                .map(|(key, reply)| (key.to_string(), reply))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));
        let disconnected = Arc::new(Notify::new());

        let server_requests = requests.clone();
        let server_disconnected = disconnected.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(handle(
                    socket,
                    routes.clone(),
                    server_requests.clone(),
                    server_disconnected.clone(),
                ));
            }
        });

        Self {
            addr,
            requests,
            disconnected,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("Request log poisoned").clone()
    }

    /// Wait until a client leaves a [`Reply::StreamThenHold`] response.
    pub async fn wait_for_disconnect(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.disconnected.notified())
            .await
            .is_ok()
    }
}

/// Base URL of a port nothing listens on.
#[allow(dead_code)]
pub async fn unused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind loopback listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    drop(listener);
    format!("http://{addr}")
}

async fn handle(
    mut socket: TcpStream,
    routes: Arc<Vec<(String, Reply)>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    disconnected: Arc<Notify>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };

    let key = format!("{} {}", request.method, request.path);
    let reply = routes
        .iter()
        .find(|(route, _)| *route == key)
        .map(|(_, reply)| reply.clone())
        .unwrap_or(Reply::Json {
            status: 404,
            body: r#"{"detail":"Not Found"}"#.to_string(),
        });
    requests.lock().expect("Request log poisoned").push(request);

    let _ = write_reply(&mut socket, reply, &disconnected).await;
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string();
    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

async fn write_reply(
    socket: &mut TcpStream,
    reply: Reply,
    disconnected: &Notify,
) -> std::io::Result<()> {
    match reply {
        Reply::Json { status, body } => {
            let head = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reason(status),
                body.len()
            );
            socket.write_all(head.as_bytes()).await?;
            socket.write_all(body.as_bytes()).await?;
            socket.shutdown().await
        }
        Reply::Empty { status } => {
            let head = format!(
                "HTTP/1.1 {status} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                reason(status)
            );
            socket.write_all(head.as_bytes()).await?;
            socket.shutdown().await
        }
        Reply::Stream { chunks, delay } => {
            write_stream_head(socket).await?;
            for chunk in chunks {
                write_chunk(socket, &chunk).await?;
                tokio::time::sleep(delay).await;
            }
            socket.write_all(b"0\r\n\r\n").await?;
            socket.shutdown().await
        }
        Reply::StreamThenDrop { chunks } => {
            write_stream_head(socket).await?;
            for chunk in chunks {
                write_chunk(socket, &chunk).await?;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            // Dropping the socket ends the body mid-message
            Ok(())
        }
        Reply::StreamThenHold { chunks } => {
            write_stream_head(socket).await?;
            for chunk in chunks {
                write_chunk(socket, &chunk).await?;
            }
            let mut sink = [0u8; 256];
            while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
            disconnected.notify_one();
            Ok(())
        }
    }
}

async fn write_stream_head(socket: &mut TcpStream) -> std::io::Result<()> {
    socket
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        )
        .await
}

async fn write_chunk(socket: &mut TcpStream, chunk: &str) -> std::io::Result<()> {
    let framed = format!("{:x}\r\n{chunk}\r\n", chunk.len());
    socket.write_all(framed.as_bytes()).await?;
    socket.flush().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
