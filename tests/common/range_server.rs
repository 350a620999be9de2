//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one static body: HEAD answers with Content-Length, GET with a
//! `Range: bytes=X-Y` header answers 206 with the inclusive slice, and POST
//! drains the request body and answers 200 (multipart upload sink).

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Byte counts received by POST requests, shared with the spawning test.
pub type UploadCounter = Arc<AtomicU64>;

/// Start a server in a background thread serving `body`. Returns the base
/// URL and a counter of POSTed body bytes. The server runs until the process
/// exits.
pub fn start(body: Vec<u8>) -> (String, UploadCounter) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let uploaded = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&uploaded);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let uploaded = Arc::clone(&uploaded);
            thread::spawn(move || handle(stream, &body, &uploaded));
        }
    });
    (format!("http://127.0.0.1:{}/", port), counter)
}

fn handle(mut stream: TcpStream, body: &[u8], uploaded: &AtomicU64) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));

    let (head, mut body_read) = match read_head(&mut stream) {
        Some(parts) => parts,
        None => return,
    };
    let req = match Request::parse(&head) {
        Some(req) => req,
        None => return,
    };
    let total = body.len() as u64;

    match req.method.as_str() {
        "HEAD" => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\n\r\n",
                total
            );
            let _ = stream.write_all(response.as_bytes());
        }
        "GET" => {
            let (status, slice) = match req.range {
                Some((start, end)) => {
                    let start = start.min(total) as usize;
                    let end_excl = end
                        .saturating_add(1)
                        .min(total) as usize;
                    ("206 Partial Content", &body[start.min(end_excl)..end_excl])
                }
                None => ("200 OK", body),
            };
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\n\r\n",
                status,
                slice.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(slice);
        }
        "POST" => {
            // Drain the multipart body so curl sees the whole request accepted.
            let mut remaining = req.content_length.saturating_sub(body_read.len() as u64);
            uploaded.fetch_add(body_read.len() as u64, Ordering::SeqCst);
            let mut buf = [0u8; 8192];
            while remaining > 0 {
                let want = buf.len().min(remaining as usize);
                match stream.read(&mut buf[..want]) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        uploaded.fetch_add(n as u64, Ordering::SeqCst);
                        remaining -= n as u64;
                    }
                }
            }
            body_read.clear();
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        }
        _ => {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
        }
    }
}

/// Read until the header terminator; returns (headers, leftover body bytes).
fn read_head(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).into_owned();
            let rest = buf.split_off(pos + 4);
            return Some((head, rest));
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    }
}

struct Request {
    method: String,
    range: Option<(u64, u64)>,
    content_length: u64,
}

impl Request {
    fn parse(head: &str) -> Option<Request> {
        let mut lines = head.lines();
        let method = lines
            .next()?
            .split_whitespace()
            .next()?
            .to_ascii_uppercase();
        let mut range = None;
        let mut content_length = 0;
        for line in lines {
            let (name, value) = match line.split_once(':') {
                Some(pair) => pair,
                None => continue,
            };
            let value = value.trim();
            if name.trim().eq_ignore_ascii_case("range") {
                range = parse_range(value);
            } else if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            }
        }
        Some(Request {
            method,
            range,
            content_length,
        })
    }
}

/// Parse `bytes=X-Y` into an inclusive pair; open-ended ranges read to EOF.
fn parse_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = if end.trim().is_empty() {
        u64::MAX
    } else {
        end.trim().parse().ok()?
    };
    Some((start, end))
}
