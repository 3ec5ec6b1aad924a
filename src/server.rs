//! HTTP server
//!
//! Minimal HTTP/1.1 handling on top of tokio: one task per connection, one
//! request per connection, `Connection: close` on every response.

use crate::ask::AskService;
use crate::error::{QaError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

const INDEX_HTML: &str = include_str!("../ui/index.html");
const MAX_REQUEST_BYTES: usize = 1_000_000;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self { status, content_type: "application/json", body: body.into() }
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body: body.into() }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            status_text(self.status),
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Accept connections until the listener fails.
pub async fn serve(listener: TcpListener, service: Arc<AskService>) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| QaError::Server(format!("Listener has no address: {}", e)))?;
    info!("Server listening on http://{}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("New connection from: {}", peer);
        tokio::spawn(handle_connection(stream, Arc::clone(&service)));
    }
}

async fn handle_connection(mut stream: TcpStream, service: Arc<AskService>) {
    let raw = match timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            error!("Failed to read from stream: {}", e);
            return;
        }
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
    };

    if raw.is_empty() {
        return;
    }

    let response = match parse_request(&raw) {
        Some(request) => route(&request, &service).await,
        None => HttpResponse::json(400, r#"{"error":"Bad request"}"#),
    };

    if let Err(e) = stream.write_all(&response.to_bytes()).await {
        error!("Failed to write response: {}", e);
    }
    let _ = stream.shutdown().await;
}

/// Read one request: headers plus `Content-Length` bytes of body, capped at
/// `MAX_REQUEST_BYTES`.
pub async fn read_request<S>(stream: &mut S) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(headers_end) = find_headers_end(&buffer) {
            let head = String::from_utf8_lossy(&buffer[..headers_end]);
            let content_length = extract_content_length(&head).unwrap_or(0);
            if buffer.len() >= headers_end + content_length {
                break;
            }
        }

        if buffer.len() > MAX_REQUEST_BYTES {
            break;
        }
    }

    Ok(buffer)
}

/// Offset just past the blank line that ends the header block.
fn find_headers_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn extract_content_length(head: &str) -> Option<usize> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

pub fn parse_request(raw: &[u8]) -> Option<HttpRequest> {
    let headers_end = find_headers_end(raw)?;
    let head = std::str::from_utf8(&raw[..headers_end]).ok()?;
    let mut lines = head.lines();

    let mut parts = lines.next()?.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;

    // Drop the query string and any trailing slash except on root.
    let path = target.split('?').next().unwrap_or(target);
    let path = match path.trim_end_matches('/') {
        "" => "/".to_string(),
        p => p.to_string(),
    };

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let body_bytes = &raw[headers_end..];
    let body_len = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .map(|len| len.min(body_bytes.len()))
        .unwrap_or(body_bytes.len());
    let body = String::from_utf8_lossy(&body_bytes[..body_len]).into_owned();

    Some(HttpRequest { method, path, headers, body })
}

pub async fn route(request: &HttpRequest, service: &AskService) -> HttpResponse {
    debug!("Request: {} {}", request.method, request.path);

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => HttpResponse::html(INDEX_HTML),
        ("GET", "/api/health") => health(service),
        ("POST", "/ask") => {
            let reply = service.ask_json(&request.body).await;
            HttpResponse::json(reply.status, reply.to_json())
        }
        ("OPTIONS", _) => HttpResponse::json(204, ""),
        _ => HttpResponse::json(404, r#"{"error":"Not found"}"#),
    }
}

fn health(service: &AskService) -> HttpResponse {
    let store = service.store();
    let body = serde_json::json!({
        "status": "ok",
        "table": store.table_name(),
        "rows": store.row_count(),
        "columns": store.columns().len(),
        "loaded_at": store.loaded_at().to_rfc3339(),
    });
    HttpResponse::json(200, body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_line_headers_and_body() {
        let raw = b"POST /ask HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 17\r\n\r\n{\"question\":\"hi\"}";
        let request = parse_request(raw).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/ask");
        assert_eq!(request.headers.get("content-type").unwrap(), "application/json");
        assert_eq!(request.body, r#"{"question":"hi"}"#);
    }

    #[test]
    fn normalizes_path() {
        let request = parse_request(b"GET /api/health/?verbose=1 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(request.path, "/api/health");
        let root = parse_request(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(root.path, "/");
    }

    #[test]
    fn incomplete_head_is_rejected() {
        assert!(parse_request(b"GET / HTTP/1.1\r\nHost: x").is_none());
        assert!(parse_request(b"\r\n\r\n").is_none());
    }

    #[test]
    fn content_length_header_is_case_insensitive() {
        assert_eq!(extract_content_length("POST / HTTP/1.1\r\ncontent-LENGTH: 12\r\n"), Some(12));
        assert_eq!(extract_content_length("GET / HTTP/1.1\r\n"), None);
    }

    #[test]
    fn response_length_counts_bytes() {
        let response = HttpResponse::json(400, r#"{"answer":"❌ Question is required"}"#);
        let text = String::from_utf8(response.to_bytes()).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.contains(&format!("Content-Length: {}\r\n", response.body.len())));
        assert!(text.ends_with(&response.body));
    }

    #[tokio::test]
    async fn reads_body_split_across_packets() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            client
                .write_all(b"POST /ask HTTP/1.1\r\nContent-Length: 5\r\n\r\nab")
                .await
                .unwrap();
            client.write_all(b"cde").await.unwrap();
            client
        });
        let raw = read_request(&mut server).await.unwrap();
        let _client = writer.await.unwrap();
        assert!(raw.ends_with(b"\r\n\r\nabcde"));
    }
}
