// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures: a scripted WebSocket job server, login mocks, and a
// printer that records what it was asked to print.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use barebox_core::AgentConfig;
use barebox_core::config::Credentials;
use barebox_core::error::Result;
use barebox_print::Printer;

pub const LOGIN_PATH: &str = "/accounts/login/";
pub const WAIT_LIMIT: Duration = Duration::from_secs(10);

// ─── Printer ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct PrinterState {
    printed: Mutex<Vec<PathBuf>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Succeeds after a pause, remembering every path and the highest number of
/// overlapping print calls.
#[derive(Clone)]
pub struct RecordingPrinter {
    state: Arc<PrinterState>,
    delay: Duration,
}

impl Default for RecordingPrinter {
    fn default() -> Self {
        Self::slow(Duration::from_millis(20))
    }
}

impl RecordingPrinter {
    pub fn slow(delay: Duration) -> Self {
        Self {
            state: Arc::default(),
            delay,
        }
    }

    pub fn printed(&self) -> Vec<PathBuf> {
        self.state.printed.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Printer for RecordingPrinter {
    fn name(&self) -> &str {
        "recording"
    }

    async fn print(&self, path: &Path) -> Result<()> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.state.printed.lock().unwrap().push(path.to_path_buf());
        tokio::time::sleep(self.delay).await;
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─── Job stream server ───────────────────────────────────────────────────

/// One scripted action on an accepted connection.
#[derive(Debug, Clone)]
pub enum Step {
    Send(String),
    Close,
}

#[derive(Debug, Clone)]
pub struct Handshake {
    pub uri: String,
    pub cookie: Option<String>,
}

/// Accepts WebSocket connections and plays one script per connection, in
/// accept order.  Connections without a script (or whose script does not
/// close) stay open until the client goes away.
pub struct StreamServer {
    pub base_url: String,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
    task: JoinHandle<()>,
}

impl StreamServer {
    pub async fn start(scripts: Vec<Vec<Step>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handshakes = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&handshakes);
        let task = tokio::spawn(async move {
            let mut scripts = scripts.into_iter();
            while let Ok((tcp, _)) = listener.accept().await {
                let script = scripts.next().unwrap_or_default();
                tokio::spawn(serve(tcp, script, Arc::clone(&seen)));
            }
        });

        Self {
            base_url: format!("ws://{addr}/ws/"),
            handshakes,
            task,
        }
    }

    pub fn handshakes(&self) -> Vec<Handshake> {
        self.handshakes.lock().unwrap().clone()
    }

    pub async fn wait_for_handshakes(&self, n: usize) -> Vec<Handshake> {
        let deadline = Instant::now() + WAIT_LIMIT;
        loop {
            let seen = self.handshakes();
            if seen.len() >= n {
                return seen;
            }
            assert!(Instant::now() < deadline, "timed out waiting for {n} handshakes");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(tcp: tokio::net::TcpStream, script: Vec<Step>, seen: Arc<Mutex<Vec<Handshake>>>) {
    let record = move |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
        seen.lock().unwrap().push(Handshake {
            uri: req.uri().to_string(),
            cookie: req
                .headers()
                .get("cookie")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
        Ok(resp)
    };

    let Ok(mut ws) = accept_hdr_async(tcp, record).await else {
        return;
    };

    for step in script {
        match step {
            Step::Send(text) => {
                if ws.send(Message::text(text)).await.is_err() {
                    return;
                }
            }
            Step::Close => {
                let _ = ws
                    .close(Some(CloseFrame {
                        code: CloseCode::Away,
                        reason: "server restart".into(),
                    }))
                    .await;
                while let Some(Ok(_)) = ws.next().await {}
                return;
            }
        }
    }

    while let Some(Ok(_)) = ws.next().await {}
}

// ─── HTTP service ────────────────────────────────────────────────────────

/// Login page that sets a CSRF cookie and a login form that answers with
/// `login_status` (302 sets the session cookie).
pub async fn mount_login(server: &MockServer, login_status: u16) {
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200).append_header("Set-Cookie", "csrftoken=tok; Path=/"),
        )
        .mount(server)
        .await;

    let mut answer = ResponseTemplate::new(login_status);
    if login_status == 302 {
        answer = answer
            .insert_header("Location", "/")
            .append_header("Set-Cookie", "sessionid=sid; Path=/");
    }
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(answer)
        .mount(server)
        .await;
}

pub async fn mount_image(server: &MockServer, image_path: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(b"\xFF\xD8\xFFjpeg".to_vec()))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer) {
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

pub async fn requests(server: &MockServer, verb: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb)
        .collect()
}

pub async fn wait_for_requests(server: &MockServer, verb: &str, n: usize) -> Vec<wiremock::Request> {
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        let seen = requests(server, verb).await;
        if seen.len() >= n {
            return seen;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {n} {verb} requests");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Decoded form body of a request.
pub fn form(request: &wiremock::Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

pub fn config(http: &MockServer, stream: &StreamServer, scratch: &Path) -> AgentConfig {
    AgentConfig {
        login_url: format!("{}{LOGIN_PATH}", http.uri()),
        streaming_base_url: stream.base_url.clone(),
        status_url: format!("{}/photos/", http.uri()),
        credentials: Credentials {
            login: "owner".into(),
            password: "secret".into(),
        },
        scratch_dir: scratch.to_path_buf(),
        log_dir: scratch.join("logs"),
        retry_delay_secs: 1,
        idle_timeout_secs: 30,
        print_command: "lpr".into(),
    }
}
