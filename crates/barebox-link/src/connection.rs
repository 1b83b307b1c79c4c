// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job-notification stream.
//
// One WebSocket per session.  Frames are handled strictly one at a time: the
// next frame is not read until the current job has been printed and
// reported.  The connection ends on a close frame, a transport error, end of
// stream, a silent stream, or shutdown.  Shutdown is only observed while
// waiting for a frame, so a job that has started always reaches its report.

use std::time::Duration;

use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, HeaderValue};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use barebox_core::{AgentConfig, Session};

use crate::handler::JobHandler;

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnect {
    /// The handshake never completed.
    ConnectFailed(String),
    /// The server sent a close frame.
    Closed { code: Option<u16>, reason: String },
    /// The socket failed mid-stream.
    Transport(String),
    /// The stream ended without a close frame.
    EndOfStream,
    /// Shutdown was requested.
    Shutdown,
}

impl std::fmt::Display for Disconnect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectFailed(e) => write!(f, "connect failed: {e}"),
            Self::Closed { code, reason } => match code {
                Some(code) => write!(f, "closed by server: {code}, {reason}"),
                None => write!(f, "closed by server"),
            },
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::EndOfStream => write!(f, "end of stream"),
            Self::Shutdown => write!(f, "shutdown requested"),
        }
    }
}

/// Opens the job stream for a session and pumps its frames into a handler.
pub struct StreamClient {
    url: String,
    idle_timeout: Duration,
}

impl StreamClient {
    pub fn new(url: impl Into<String>, idle_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            idle_timeout,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.stream_url(), config.idle_timeout())
    }

    /// Run one connection to completion, or until `shutdown` fires between
    /// frames.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn run(
        &self,
        session: &Session,
        handler: &JobHandler,
        shutdown: &CancellationToken,
    ) -> Disconnect {
        let mut request = match self.url.as_str().into_client_request() {
            Ok(request) => request,
            Err(e) => return Disconnect::ConnectFailed(e.to_string()),
        };
        let cookie = match HeaderValue::from_str(&session.stream_cookie()) {
            Ok(value) => value,
            Err(e) => return Disconnect::ConnectFailed(format!("session cookie: {e}")),
        };
        request.headers_mut().insert(COOKIE, cookie);

        debug!("trying to establish a websocket connection on behalf of logged in user");
        let connected = tokio::select! {
            _ = shutdown.cancelled() => return Disconnect::Shutdown,
            connected = connect_async(request) => connected,
        };
        let (mut ws, _) = match connected {
            Ok(pair) => pair,
            Err(e) => return Disconnect::ConnectFailed(e.to_string()),
        };
        debug!("connection established");

        let mut closed = None;
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => None,
                next = tokio::time::timeout(self.idle_timeout, ws.next()) => Some(next),
            };
            let Some(next) = next else {
                if let Err(e) = ws.close(None).await {
                    debug!(error = %e, "close on shutdown failed");
                }
                return Disconnect::Shutdown;
            };

            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        idle_secs = self.idle_timeout.as_secs_f32(),
                        "no frame received, dropping connection"
                    );
                    return Disconnect::Transport(format!(
                        "no frame within {:?}",
                        self.idle_timeout
                    ));
                }
            };

            match frame {
                Ok(Message::Text(text)) => {
                    handler.handle(session, text.as_str()).await;
                }
                Ok(Message::Binary(data)) => {
                    debug!(len = data.len(), "ignoring binary frame");
                }
                Ok(Message::Close(frame)) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                        None => (None, String::new()),
                    };
                    debug!(?code, reason = %reason, "connection closed down");
                    closed = Some(Disconnect::Closed { code, reason });
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => {
                    if let Some(closed) = closed {
                        return closed;
                    }
                    debug!(error = %e, "connection terminated");
                    return Disconnect::Transport(e.to_string());
                }
            }
        }

        closed.unwrap_or(Disconnect::EndOfStream)
    }
}
