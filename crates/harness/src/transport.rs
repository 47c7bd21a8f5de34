//! HTTP transport with normalized outcomes.
//!
//! Non-2xx statuses, timeouts and refused connections are all returned as
//! [`HttpOutcome`] values. Whether any of them is a failure is a decision
//! for the probe, not for the transport.

use agentprobe_common::{Error, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Response payload, parsed as JSON when possible.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

impl Body {
    fn parse(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Body::Json(value),
            Err(_) => Body::Text(text),
        }
    }

    /// JSON value, if the payload parsed.
    pub fn json(&self) -> Option<&Value> {
        match self {
            Body::Json(v) => Some(v),
            Body::Text(_) => None,
        }
    }

    /// Payload as text, re-serializing JSON.
    pub fn text(&self) -> String {
        match self {
            Body::Json(v) => v.to_string(),
            Body::Text(t) => t.clone(),
        }
    }
}

/// Result of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpOutcome {
    /// The server answered, whatever the status.
    Response {
        path: String,
        status: u16,
        body: Body,
    },
    /// No answer within the configured timeout.
    Timeout { path: String },
    /// Connection refused, DNS failure, TLS failure, broken body.
    Unreachable { path: String, reason: String },
}

impl HttpOutcome {
    pub fn path(&self) -> &str {
        match self {
            HttpOutcome::Response { path, .. }
            | HttpOutcome::Timeout { path }
            | HttpOutcome::Unreachable { path, .. } => path,
        }
    }

    /// True for a 2xx response.
    pub fn is_success(&self) -> bool {
        matches!(self, HttpOutcome::Response { status, .. } if (200..300).contains(status))
    }

    /// True when the endpoint does not exist here: HTTP 404 or nothing listening.
    pub fn is_not_found(&self) -> bool {
        match self {
            HttpOutcome::Response { status, .. } => *status == StatusCode::NOT_FOUND.as_u16(),
            HttpOutcome::Unreachable { .. } => true,
            HttpOutcome::Timeout { .. } => false,
        }
    }
}

impl fmt::Display for HttpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpOutcome::Response { path, status, .. } => {
                write!(f, "HTTP {} from {}", status, path)
            }
            HttpOutcome::Timeout { path } => write!(f, "timed out waiting for {}", path),
            HttpOutcome::Unreachable { path, reason } => {
                write!(f, "{} unreachable: {}", path, reason)
            }
        }
    }
}

/// Thin wrapper over `reqwest::Client` bound to one base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpTransport {
    /// Build a transport whose every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            bearer_token: None,
        })
    }

    /// Attach `Authorization: Bearer <token>` to every request.
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> HttpOutcome {
        self.send(Method::GET, path, None).await
    }

    pub async fn post_json(&self, path: &str, payload: &Value) -> HttpOutcome {
        self.send(Method::POST, path, Some(payload)).await
    }

    /// Try candidate paths in order; the first one that is not "not found"
    /// wins. When every candidate is absent, the last outcome is returned.
    pub async fn first_available(
        &self,
        method: Method,
        paths: &[String],
        payload: Option<&Value>,
    ) -> HttpOutcome {
        let mut last = HttpOutcome::Unreachable {
            path: String::new(),
            reason: "no candidate paths configured".to_string(),
        };

        for path in paths {
            let outcome = self.send(method.clone(), path, payload).await;
            if !outcome.is_not_found() {
                return outcome;
            }
            debug!("{} not available, trying next candidate", path);
            last = outcome;
        }

        last
    }

    async fn send(&self, method: Method, path: &str, payload: Option<&Value>) -> HttpOutcome {
        let url = self.url_for(path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return classify_error(path, &e),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(text) => HttpOutcome::Response {
                path: path.to_string(),
                status,
                body: Body::parse(text),
            },
            Err(e) => classify_error(path, &e),
        }
    }
}

fn classify_error(path: &str, e: &reqwest::Error) -> HttpOutcome {
    if e.is_timeout() {
        HttpOutcome::Timeout {
            path: path.to_string(),
        }
    } else {
        HttpOutcome::Unreachable {
            path: path.to_string(),
            reason: e.to_string(),
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let has_host = trimmed
        .split_once("://")
        .map(|(scheme, rest)| matches!(scheme, "http" | "https") && !rest.is_empty());

    match has_host {
        Some(true) => Ok(trimmed.to_string()),
        _ => Err(Error::InvalidUrl {
            url: raw.to_string(),
            reason: "expected http:// or https:// followed by a host".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_paths() {
        let transport = HttpTransport::new("http://localhost:3000/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:3000");
        assert_eq!(transport.url_for("/health"), "http://localhost:3000/health");
        assert_eq!(transport.url_for("api/models"), "http://localhost:3000/api/models");
        assert_eq!(transport.url_for("/"), "http://localhost:3000/");
        assert_eq!(
            transport.url_for("http://relay:3002/message"),
            "http://relay:3002/message"
        );
    }

    #[test]
    fn test_rejects_base_url_without_scheme() {
        assert!(HttpTransport::new("localhost:3000", Duration::from_secs(5)).is_err());
        assert!(HttpTransport::new("ftp://host", Duration::from_secs(5)).is_err());
        assert!(HttpTransport::new("http://", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_body_parse() {
        assert!(matches!(Body::parse(r#"{"agentCount": 2}"#.into()), Body::Json(_)));
        assert!(matches!(Body::parse("<html></html>".into()), Body::Text(_)));
    }

    #[test]
    fn test_not_found_classification() {
        let missing = HttpOutcome::Response {
            path: "/api/plugins".into(),
            status: 404,
            body: Body::Text(String::new()),
        };
        let refused = HttpOutcome::Unreachable {
            path: "/api/plugins".into(),
            reason: "connection refused".into(),
        };
        let broken = HttpOutcome::Response {
            path: "/api/plugins".into(),
            status: 500,
            body: Body::Text(String::new()),
        };
        let slow = HttpOutcome::Timeout {
            path: "/api/plugins".into(),
        };

        assert!(missing.is_not_found());
        assert!(refused.is_not_found());
        assert!(!broken.is_not_found());
        assert!(!slow.is_not_found());
        assert!(!broken.is_success());
    }

    #[tokio::test]
    async fn test_first_available_without_candidates() {
        let transport = HttpTransport::new("http://localhost:3000", Duration::from_secs(1)).unwrap();
        let outcome = transport.first_available(Method::GET, &[], None).await;
        assert!(matches!(outcome, HttpOutcome::Unreachable { .. }));
    }
}
