//! Minimal HTTP/1.1 server with scripted replies for integration tests.
//!
//! Each path gets a queue of replies consumed one per request; once a queue
//! is empty the path answers 404, like a filter service asked for a run it
//! does not have yet. Every request line is recorded.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, Vec<u8>),
    /// Accept the request and say nothing for this long.
    Stall(Duration),
}

impl Reply {
    pub fn ok(body: &[u8]) -> Self {
        Reply::Status(200, body.to_vec())
    }

    pub fn status(code: u16) -> Self {
        Reply::Status(code, Vec::new())
    }
}

#[derive(Default)]
struct State {
    script: HashMap<String, VecDeque<Reply>>,
    requests: Vec<String>,
}

pub struct StatusServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl StatusServer {
    /// `script` maps a path (e.g. "/c1") to its replies in order.
    pub fn start(script: Vec<(&str, Vec<Reply>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State {
            script: script
                .into_iter()
                .map(|(path, replies)| (path.to_string(), replies.into()))
                .collect(),
            requests: Vec::new(),
        }));
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{port}"),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Request targets (path and query) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let path = target.split('?').next().unwrap_or("/").to_string();

    let reply = {
        let mut state = state.lock().unwrap();
        state.requests.push(target);
        state
            .script
            .get_mut(&path)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Reply::status(404))
    };

    match reply {
        Reply::Stall(duration) => thread::sleep(duration),
        Reply::Status(code, body) => {
            let head = format!(
                "HTTP/1.1 {code} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reason(code),
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
        }
    }
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
