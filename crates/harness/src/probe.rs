//! Probe trait and result types.

use crate::chat::{ChatTransport, HttpChatTransport};
use crate::config::SuiteConfig;
use crate::transport::HttpTransport;
use agentprobe_common::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Classification of a single probe execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeStatus {
    Passed,
    Failed,
    /// Tolerated problem, e.g. an optional endpoint that is absent.
    Warn,
    /// The probe itself broke (returned an error or panicked).
    Error,
}

impl ProbeStatus {
    /// Whether this status counts against the run.
    pub fn is_failure(&self) -> bool {
        matches!(self, ProbeStatus::Failed | ProbeStatus::Error)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProbeStatus::Passed => "PASSED",
            ProbeStatus::Failed => "FAILED",
            ProbeStatus::Warn => "WARN",
            ProbeStatus::Error => "ERROR",
        };
        f.pad(label)
    }
}

/// What a probe concluded. `Error` is reserved for the suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: ProbeStatus,
    pub detail: String,
}

impl Verdict {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Passed,
            detail: detail.into(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Failed,
            detail: detail.into(),
        }
    }

    pub fn warn(detail: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Warn,
            detail: detail.into(),
        }
    }
}

/// Outcome of exactly one probe execution. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    name: String,
    status: ProbeStatus,
    detail: String,
    duration_ms: u64,
}

impl ProbeResult {
    pub fn new(
        name: impl Into<String>,
        status: ProbeStatus,
        detail: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ProbeStatus {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Shared, read-only state handed to every probe.
#[derive(Clone)]
pub struct ProbeContext {
    pub http: HttpTransport,
    pub chat: Option<Arc<dyn ChatTransport>>,
    pub agent_name: String,
}

impl ProbeContext {
    pub fn new(http: HttpTransport, agent_name: impl Into<String>) -> Self {
        Self {
            http,
            chat: None,
            agent_name: agent_name.into(),
        }
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatTransport>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Build transports from configuration. The chat transport is only
    /// created when a chat section is present.
    pub fn from_config(config: &SuiteConfig) -> Result<Self> {
        let http = HttpTransport::new(
            &config.base_url,
            Duration::from_secs(config.http_timeout_secs),
        )?
        .with_bearer_token(config.api_token.clone());

        let mut ctx = Self::new(http, config.agent_name.clone());

        if let Some(chat) = &config.chat {
            let relay_base = chat.url.as_deref().unwrap_or(&config.base_url);
            let relay = HttpTransport::new(relay_base, Duration::from_secs(chat.timeout_secs))?
                .with_bearer_token(config.api_token.clone());
            let transport = HttpChatTransport::new(relay, chat.paths.clone(), chat.user_id.clone());
            ctx = ctx.with_chat(Arc::new(transport));
        }

        Ok(ctx)
    }
}

impl fmt::Debug for ProbeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeContext")
            .field("base_url", &self.http.base_url())
            .field("chat", &self.chat.is_some())
            .field("agent_name", &self.agent_name)
            .finish()
    }
}

/// A single check performed against the target service.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Name shown in the report.
    fn name(&self) -> &str;

    /// Run the check. An `Err` is recorded as [`ProbeStatus::Error`].
    async fn run(&self, ctx: &ProbeContext) -> anyhow::Result<Verdict>;
}
