//! Minimal HTTP/1.1 server for integration tests: HEAD and Range GET over one
//! static body, with knobs for failures, delays and range support.
//!
//! Every response carries `Connection: close`, so each request is its own
//! connection and in-flight accounting equals concurrent requests.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405.
    pub head_blocked: bool,
    /// If true, GET ignores Range and always returns 200 with the full body.
    pub ignore_ranges: bool,
    /// If true, omit `Accept-Ranges: bytes` even though ranges work.
    pub hide_accept_ranges: bool,
    /// `(start, end)` → number of 500 responses before the range succeeds.
    pub fail_ranges: HashMap<(u64, u64), usize>,
    /// `(start, end)` → delay before the range response is written.
    pub delays: HashMap<(u64, u64), Duration>,
    /// Delay applied to every GET without a per-range entry.
    pub default_delay: Option<Duration>,
}

/// One request as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub method: String,
    pub range: Option<(u64, u64)>,
    pub user_agent: Option<String>,
}

pub struct RangeServer {
    pub url: String,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
    max_in_flight: Arc<AtomicUsize>,
}

impl RangeServer {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// GET requests only, in arrival order.
    pub fn gets(&self) -> Vec<SeenRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "GET")
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct Shared {
    body: Vec<u8>,
    opts: RangeServerOptions,
    remaining_failures: Mutex<HashMap<(u64, u64), usize>>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
    in_flight: AtomicUsize,
    max_in_flight: Arc<AtomicUsize>,
}

pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let shared = Arc::new(Shared {
        body,
        remaining_failures: Mutex::new(opts.fail_ranges.clone()),
        opts,
        requests: Arc::clone(&requests),
        in_flight: AtomicUsize::new(0),
        max_in_flight: Arc::clone(&max_in_flight),
    });
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let shared = Arc::clone(&shared);
            thread::spawn(move || handle(stream, &shared));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/file.bin", port),
        requests,
        max_in_flight,
    }
}

fn handle(mut stream: TcpStream, shared: &Shared) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let seen = parse_request(&request);
    shared.requests.lock().unwrap().push(seen.clone());

    let now = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
    respond(&mut stream, shared, &seen);
    shared.in_flight.fetch_sub(1, Ordering::SeqCst);
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8(buf).ok()
}

fn respond(stream: &mut TcpStream, shared: &Shared, req: &SeenRequest) {
    let opts = &shared.opts;
    let body = &shared.body;
    let total = body.len() as u64;
    let accept_ranges = if opts.ignore_ranges || opts.hide_accept_ranges {
        ""
    } else {
        "Accept-Ranges: bytes\r\n"
    };

    if req.method == "HEAD" {
        if opts.head_blocked {
            write_head(stream, "405 Method Not Allowed", 0, "");
            return;
        }
        let extra = format!("{}Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT\r\n", accept_ranges);
        write_head(stream, "200 OK", total, &extra);
        return;
    }
    if req.method != "GET" {
        write_head(stream, "405 Method Not Allowed", 0, "");
        return;
    }

    let range = if opts.ignore_ranges { None } else { req.range };
    if let Some(key) = range {
        let delay = opts.delays.get(&key).copied().or(opts.default_delay);
        if let Some(d) = delay {
            thread::sleep(d);
        }
        let fail = {
            let mut remaining = shared.remaining_failures.lock().unwrap();
            match remaining.get_mut(&key) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        };
        if fail {
            write_head(stream, "500 Internal Server Error", 0, "");
            return;
        }
        let (start, end) = key;
        if start >= total || start > end {
            let extra = format!("Content-Range: bytes */{}\r\n", total);
            write_head(stream, "416 Range Not Satisfiable", 0, &extra);
            return;
        }
        let end = end.min(total - 1);
        let slice = &body[start as usize..=end as usize];
        let extra = format!(
            "{}Content-Range: bytes {}-{}/{}\r\n",
            accept_ranges, start, end, total
        );
        write_head(stream, "206 Partial Content", slice.len() as u64, &extra);
        let _ = stream.write_all(slice);
        return;
    }

    if let Some(d) = opts.default_delay {
        thread::sleep(d);
    }
    write_head(stream, "200 OK", total, accept_ranges);
    let _ = stream.write_all(body);
}

fn write_head(stream: &mut TcpStream, status: &str, len: u64, extra: &str) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status, len, extra
    );
    let _ = stream.write_all(head.as_bytes());
}

fn parse_request(request: &str) -> SeenRequest {
    let mut lines = request.lines();
    let method = lines
        .next()
        .and_then(|l| l.split_whitespace().next())
        .unwrap_or("")
        .to_ascii_uppercase();
    let mut range = None;
    let mut user_agent = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.trim().eq_ignore_ascii_case("range") {
            range = value
                .strip_prefix("bytes=")
                .and_then(|spec| spec.split_once('-'))
                .and_then(|(a, b)| Some((a.trim().parse().ok()?, b.trim().parse().ok()?)));
        } else if name.trim().eq_ignore_ascii_case("user-agent") {
            user_agent = Some(value.to_string());
        }
    }
    SeenRequest {
        method,
        range,
        user_agent,
    }
}

/// Deterministic non-repeating test body.
pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}
