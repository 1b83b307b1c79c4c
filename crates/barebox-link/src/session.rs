// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session acquisition.
//
// Login is the classic CSRF-cookie dance: GET the login page to obtain the
// `csrftoken` cookie, POST the credentials together with that token, and
// expect a `302 Found` that sets `sessionid`.  Redirects are not followed so
// the cookies are read straight off the login responses.  Each attempt starts
// with an empty cookie store; the service rotates the CSRF token on login, so
// the token kept in the `Session` is the one set by the POST when present.

use std::time::Duration;

use reqwest::header::REFERER;
use reqwest::{Response, StatusCode};
use reqwest::redirect::Policy;
use tracing::{debug, error, info, instrument};
use url::Url;

use barebox_core::config::Credentials;
use barebox_core::error::{BareboxError, Result};
use barebox_core::{AgentConfig, Session};

use crate::retry::{RetryConfig, RetryDecision, should_retry};

pub const CSRF_COOKIE: &str = "csrftoken";
pub const SESSION_COOKIE: &str = "sessionid";

/// Timeout for each login request.
const LOGIN_TIMEOUT_SECS: u64 = 30;

pub struct SessionManager {
    login_url: Url,
    credentials: Credentials,
    retry: RetryConfig,
}

impl SessionManager {
    pub fn new(login_url: &str, credentials: Credentials, retry: RetryConfig) -> Result<Self> {
        let login_url = Url::parse(login_url)
            .map_err(|e| BareboxError::Config(format!("login_url {login_url:?}: {e}")))?;
        Ok(Self {
            login_url,
            credentials,
            retry,
        })
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Self::new(
            &config.login_url,
            config.credentials.clone(),
            RetryConfig {
                delay: config.retry_delay(),
            },
        )
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Log in, waiting out any transport failure.
    ///
    /// Only returns an error for rejected credentials; everything else is
    /// retried after the configured delay, indefinitely.
    #[instrument(skip(self), fields(login_url = %self.login_url, user = %self.credentials.login))]
    pub async fn acquire(&self) -> Result<Session> {
        loop {
            match self.login_once().await {
                Ok(session) => return Ok(session),
                Err(err) => match should_retry(&err, &self.retry) {
                    RetryDecision::RetryAfter(delay) => {
                        debug!(
                            error = %err,
                            delay_secs = delay.as_secs_f32(),
                            "the server is down, waiting to reconnect"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::GiveUp(_) => {
                        error!(error = %err, "login rejected");
                        return Err(err);
                    }
                },
            }
        }
    }

    async fn login_once(&self) -> Result<Session> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(Duration::from_secs(LOGIN_TIMEOUT_SECS))
            .build()
            .map_err(|e| BareboxError::Transport(format!("HTTP client: {e}")))?;

        debug!("trying to connect to the server");
        let page = client
            .get(self.login_url.clone())
            .send()
            .await
            .map_err(|e| BareboxError::Transport(format!("login page: {e}")))?;

        let csrf_token = response_cookie(&page, CSRF_COOKIE).ok_or_else(|| {
            BareboxError::Transport(format!("login page did not set {CSRF_COOKIE}"))
        })?;

        debug!("trying to establish a session using provided user credentials");
        let form = [
            ("login", self.credentials.login.as_str()),
            ("password", self.credentials.password.as_str()),
            ("csrfmiddlewaretoken", csrf_token.as_str()),
            ("next", "/"),
        ];
        let response = client
            .post(self.login_url.clone())
            .header(REFERER, self.login_url.as_str())
            .form(&form)
            .send()
            .await
            .map_err(|e| BareboxError::Transport(format!("login submit: {e}")))?;

        let status = response.status();
        if status != StatusCode::FOUND {
            return Err(BareboxError::Auth(format!(
                "wrong username or password (login answered {status})"
            )));
        }

        let session_id = response_cookie(&response, SESSION_COOKIE).ok_or_else(|| {
            BareboxError::Transport(format!("login redirected without setting {SESSION_COOKIE}"))
        })?;
        let csrf_token = response_cookie(&response, CSRF_COOKIE).unwrap_or(csrf_token);

        info!("logged in");
        Ok(Session::new(csrf_token, session_id))
    }
}

fn response_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOGIN_PATH: &str = "/accounts/login/";

    fn manager(server: &MockServer) -> SessionManager {
        SessionManager::new(
            &format!("{}{LOGIN_PATH}", server.uri()),
            Credentials {
                login: "owner".into(),
                password: "secret".into(),
            },
            RetryConfig {
                delay: Duration::from_millis(20),
            },
        )
        .unwrap()
    }

    async fn mount_login_page(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(200).append_header("Set-Cookie", "csrftoken=first; Path=/"),
            )
            .mount(server)
            .await;
    }

    async fn count(server: &MockServer, verb: &str) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == verb)
            .count()
    }

    #[tokio::test]
    async fn login_yields_session_with_rotated_token() {
        let server = MockServer::start().await;
        mount_login_page(&server).await;
        let login_url = format!("{}{LOGIN_PATH}", server.uri());
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(header("Referer", login_url.as_str()))
            .and(body_string_contains("login=owner"))
            .and(body_string_contains("password=secret"))
            .and(body_string_contains("csrfmiddlewaretoken=first"))
            .and(body_string_contains("next=%2F"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/")
                    .append_header("Set-Cookie", "csrftoken=rotated; Path=/")
                    .append_header("Set-Cookie", "sessionid=s3ss10n; Path=/; HttpOnly"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = manager(&server).acquire().await.unwrap();

        assert_eq!(session.session_id(), "s3ss10n");
        assert_eq!(session.csrf_token(), "rotated");
    }

    #[tokio::test]
    async fn non_found_response_is_auth_error_without_retry() {
        let server = MockServer::start().await;
        mount_login_page(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<form>bad login</form>"))
            .mount(&server)
            .await;

        let err = manager(&server).acquire().await.unwrap_err();

        assert!(matches!(err, BareboxError::Auth(_)));
        assert_eq!(count(&server, "POST").await, 1);
    }

    #[tokio::test]
    async fn other_redirects_are_rejected() {
        let server = MockServer::start().await;
        mount_login_page(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/"))
            .mount(&server)
            .await;

        let err = manager(&server).acquire().await.unwrap_err();
        assert!(err.to_string().contains("301"));
    }

    #[tokio::test]
    async fn missing_csrf_cookie_is_retried() {
        let server = MockServer::start().await;
        // First GET: no cookie.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        mount_login_page(&server).await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(302).append_header("Set-Cookie", "sessionid=abc; Path=/"),
            )
            .mount(&server)
            .await;

        let session = manager(&server).acquire().await.unwrap();

        assert_eq!(session.session_id(), "abc");
        assert_eq!(session.csrf_token(), "first");
        assert_eq!(count(&server, "GET").await, 2);
    }

    #[tokio::test]
    async fn redirect_without_session_cookie_is_retried() {
        let server = MockServer::start().await;
        mount_login_page(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/")
                    .append_header("Set-Cookie", "sessionid=second; Path=/; HttpOnly"),
            )
            .mount(&server)
            .await;

        let session = manager(&server).acquire().await.unwrap();

        assert_eq!(session.session_id(), "second");
        assert_eq!(session.csrf_token(), "first");
        assert_eq!(count(&server, "POST").await, 2);
        assert_eq!(count(&server, "GET").await, 2);
    }

    #[tokio::test]
    async fn unreachable_server_keeps_retrying() {
        let manager = SessionManager::new(
            "http://127.0.0.1:9/accounts/login/",
            Credentials {
                login: "owner".into(),
                password: "secret".into(),
            },
            RetryConfig {
                delay: Duration::from_millis(10),
            },
        )
        .unwrap();

        let attempt = tokio::time::timeout(Duration::from_millis(300), manager.acquire()).await;
        assert!(attempt.is_err(), "acquire must not give up on transport errors");
    }
}
