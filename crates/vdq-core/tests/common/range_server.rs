//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths. GET honours `Range: bytes=X-Y` with 206
//! Partial Content unless started with `start_ignoring_ranges`; every range
//! start is recorded so tests can check what a resume asked for.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Clone, Default)]
pub struct Requests(Arc<Mutex<Vec<(String, Option<u64>)>>>);

impl Requests {
    /// (path, range start) for every GET, in arrival order.
    pub fn all(&self) -> Vec<(String, Option<u64>)> {
        self.0.lock().unwrap().clone()
    }

    pub fn range_starts(&self, path: &str) -> Vec<u64> {
        self.all()
            .into_iter()
            .filter(|(p, _)| p == path)
            .filter_map(|(_, start)| start)
            .collect()
    }
}

/// Starts a server in a background thread serving `files` (path -> body).
/// Returns the base URL (e.g. "http://127.0.0.1:12345/") and the request log.
pub fn start(files: HashMap<String, Vec<u8>>) -> (String, Requests) {
    serve(files, true)
}

/// Like `start`, but every GET gets 200 with the whole body.
pub fn start_ignoring_ranges(files: HashMap<String, Vec<u8>>) -> (String, Requests) {
    serve(files, false)
}

fn serve(files: HashMap<String, Vec<u8>>, honor_ranges: bool) -> (String, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files = Arc::new(files);
    let requests = Requests::default();
    let log = requests.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let files = Arc::clone(&files);
            let log = log.clone();
            thread::spawn(move || handle(stream, &files, &log, honor_ranges));
        }
    });
    (format!("http://127.0.0.1:{}/", port), requests)
}

/// JSON index entry for a document served at `url` (relative to the index).
pub fn document(date: i64, url: &str, size: usize) -> serde_json::Value {
    serde_json::json!({ "date": date, "media": { "url": url, "size": size, "kind": "document" } })
}

fn handle(
    mut stream: std::net::TcpStream,
    files: &HashMap<String, Vec<u8>>,
    log: &Requests,
    honor_ranges: bool,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (method, path, range) = parse_request(request);
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    log.0.lock().unwrap().push((path.to_string(), range.map(|(s, _)| s)));

    let Some(body) = files.get(path) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        return;
    };
    let total = body.len() as u64;
    let (status, slice) = match range.filter(|_| honor_ranges) {
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl || start >= total {
                ("416 Range Not Satisfiable", &body[0..0])
            } else {
                ("206 Partial Content", &body[start as usize..=end_incl as usize])
            }
        }
        None => ("200 OK", &body[..]),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\n\r\n",
        status,
        slice.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

/// Returns (method, path, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                if let Some(spec) = value.trim().strip_prefix("bytes=") {
                    if let Some((a, b)) = spec.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim().parse::<u64>().unwrap_or(u64::MAX);
                        range = Some((start, end));
                    }
                }
            }
        }
    }
    (method, path, range)
}
