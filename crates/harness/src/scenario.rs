//! Command/reply chat scenarios.

use crate::probe::{Probe, ProbeContext, ProbeStatus, Verdict};
use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Reply excerpt length kept in details.
const EXCERPT_CHARS: usize = 100;

/// Keywords that must all appear (case-insensitive) for the set to match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet(pub Vec<String>);

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keywords.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, reply: &str) -> bool {
        let reply = reply.to_lowercase();
        self.0.iter().all(|k| reply.contains(&k.to_lowercase()))
    }
}

/// Send `command`, then judge the most recent bot reply.
///
/// The reply passes when any of the `expect` sets matches. An empty
/// `expect` accepts any reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatScenario {
    #[serde(default)]
    pub name: Option<String>,
    pub command: String,
    #[serde(default)]
    pub expect: Vec<KeywordSet>,
    /// Overrides the chat-wide timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ChatScenario {
    pub fn new(command: impl Into<String>, expect: Vec<KeywordSet>) -> Self {
        Self {
            name: None,
            command: command.into(),
            expect,
            timeout_secs: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Chat: {}", self.command))
    }

    /// Classify a reply against the expected keyword sets.
    pub fn judge(&self, reply: &str) -> Verdict {
        if self.expect.is_empty() || self.expect.iter().any(|set| set.matches(reply)) {
            Verdict::pass(format!("reply: {}", excerpt(reply)))
        } else {
            Verdict::fail(format!("unexpected reply: {}", excerpt(reply)))
        }
    }
}

/// Probe adapter for a [`ChatScenario`].
pub struct ChatProbe {
    name: String,
    scenario: ChatScenario,
    timeout: Duration,
    poll_interval: Duration,
}

impl ChatProbe {
    pub fn new(scenario: ChatScenario, default_timeout: Duration, poll_interval: Duration) -> Self {
        let timeout = scenario
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(default_timeout);
        Self {
            name: scenario.display_name(),
            scenario,
            timeout,
            poll_interval,
        }
    }
}

#[async_trait]
impl Probe for ChatProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &ProbeContext) -> anyhow::Result<Verdict> {
        let chat = ctx
            .chat
            .as_ref()
            .ok_or_else(|| anyhow!("no chat transport configured"))?;

        debug!("Sending {:?}", self.scenario.command);
        let cursor = match chat.send(&self.scenario.command).await {
            Ok(cursor) => cursor,
            Err(e) => return Ok(Verdict::fail(format!("send failed: {:#}", e))),
        };

        let deadline = Instant::now() + self.timeout;
        let mut latest: Option<String> = None;

        loop {
            // Only the newest bot message after our send counts.
            if let Some(reply) = chat
                .messages_since(cursor)
                .await?
                .into_iter()
                .filter(|m| m.from_bot)
                .last()
            {
                let verdict = self.scenario.judge(&reply.text);
                if verdict.status == ProbeStatus::Passed || chat.replies_are_inline() {
                    return Ok(verdict);
                }
                latest = Some(reply.text);
            } else if chat.replies_are_inline() {
                return Ok(Verdict::fail("agent sent no reply"));
            }

            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Ok(match latest {
            Some(reply) => self.scenario.judge(&reply),
            None => Verdict::fail(format!("no reply within {}s", self.timeout.as_secs())),
        })
    }
}

fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}
