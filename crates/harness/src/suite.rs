//! Sequential probe runner.

use crate::config::SuiteConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, ProbeStatus};
use crate::probes::EndpointProbe;
use crate::report::Report;
use crate::scenario::ChatProbe;
use agentprobe_common::Timestamp;
use agentprobe_redaction::{Redactor, RedactorConfig};
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Ordered probes and the results they produced.
pub struct ProbeSuite {
    probes: Vec<Arc<dyn Probe>>,
    results: Vec<ProbeResult>,
    redactor: Redactor,
}

impl ProbeSuite {
    pub fn new() -> Self {
        Self {
            probes: Vec::new(),
            results: Vec::new(),
            redactor: Redactor::new(),
        }
    }

    /// Endpoint probes in declared order, then chat probes when a chat
    /// section is configured.
    pub fn from_config(config: &SuiteConfig) -> Self {
        let mut suite = Self::new().with_redactor(Redactor::with_config(RedactorConfig {
            secrets: config.api_token.iter().cloned().collect(),
            additional_patterns: config.redact_patterns.clone(),
        }));

        for check in &config.endpoints {
            suite.push(EndpointProbe::new(check.clone()));
        }

        if let Some(chat) = &config.chat {
            let timeout = Duration::from_secs(chat.timeout_secs);
            let poll = Duration::from_millis(chat.poll_interval_ms);
            for scenario in chat.effective_scenarios() {
                suite.push(ChatProbe::new(scenario, timeout, poll));
            }
        }

        suite
    }

    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn push(&mut self, probe: impl Probe + 'static) {
        self.probes.push(Arc::new(probe));
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Results recorded so far, in execution order.
    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    /// Run every probe once, in order. A probe that errors or panics is
    /// recorded as ERROR and the run continues.
    pub async fn run(&mut self, ctx: Arc<ProbeContext>) -> Report {
        let started_at = Timestamp::now();
        info!(
            "Probing {} ({}) with {} probe(s)",
            ctx.http.base_url(),
            ctx.agent_name,
            self.probes.len()
        );

        for probe in self.probes.clone() {
            let result = self.run_one(probe, ctx.clone()).await;
            self.results.push(result);
        }

        Report::new(
            ctx.http.base_url(),
            &ctx.agent_name,
            started_at,
            Timestamp::now(),
            self.results.clone(),
        )
    }

    async fn run_one(&self, probe: Arc<dyn Probe>, ctx: Arc<ProbeContext>) -> ProbeResult {
        let name = probe.name().to_string();
        info!("Running probe: {}", name);
        let start = Instant::now();

        // Spawned so a panic surfaces as a JoinError instead of unwinding
        // through the suite.
        let handle = tokio::spawn(async move { probe.run(&ctx).await });

        let (status, detail) = match handle.await {
            Ok(Ok(verdict)) => (verdict.status, verdict.detail),
            Ok(Err(e)) => (ProbeStatus::Error, format!("{:#}", e)),
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    "probe task was cancelled".to_string()
                };
                (ProbeStatus::Error, format!("probe panicked: {}", reason))
            }
        };

        let detail = self.redactor.scrub(&detail);
        if status.is_failure() {
            error!("{}: {} - {}", name, status, detail);
        } else if status == ProbeStatus::Warn {
            warn!("{}: {} - {}", name, status, detail);
        } else {
            info!("{}: {} - {}", name, status, detail);
        }

        ProbeResult::new(name, status, detail, start.elapsed())
    }
}

impl Default for ProbeSuite {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Verdict;
    use crate::transport::HttpTransport;
    use async_trait::async_trait;

    struct Fixed(&'static str, ProbeStatus);

    #[async_trait]
    impl Probe for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _ctx: &ProbeContext) -> anyhow::Result<Verdict> {
            Ok(Verdict {
                status: self.1,
                detail: "fixed".to_string(),
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl Probe for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run(&self, _ctx: &ProbeContext) -> anyhow::Result<Verdict> {
            anyhow::bail!("token=abcdef123456 rejected")
        }
    }

    struct Panicking;

    #[async_trait]
    impl Probe for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn run(&self, _ctx: &ProbeContext) -> anyhow::Result<Verdict> {
            panic!("probe blew up")
        }
    }

    fn ctx() -> Arc<ProbeContext> {
        let http = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        Arc::new(ProbeContext::new(http, "test-agent"))
    }

    #[tokio::test]
    async fn test_one_result_per_probe_in_order() {
        let mut suite = ProbeSuite::new();
        suite.push(Fixed("first", ProbeStatus::Passed));
        suite.push(Failing);
        suite.push(Panicking);
        suite.push(Fixed("last", ProbeStatus::Warn));

        let report = suite.run(ctx()).await;
        let observed: Vec<_> = report
            .results
            .iter()
            .map(|r| (r.name(), r.status()))
            .collect();

        assert_eq!(
            observed,
            vec![
                ("first", ProbeStatus::Passed),
                ("failing", ProbeStatus::Error),
                ("panicking", ProbeStatus::Error),
                ("last", ProbeStatus::Warn),
            ]
        );
        assert!(report.results[2].detail().contains("probe blew up"));
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_error_details_are_redacted() {
        let mut suite = ProbeSuite::new();
        suite.push(Failing);

        let report = suite.run(ctx()).await;
        assert!(!report.results[0].detail().contains("abcdef123456"));
    }

    #[tokio::test]
    async fn test_all_passing_exits_zero() {
        let mut suite = ProbeSuite::new();
        suite.push(Fixed("a", ProbeStatus::Passed));
        suite.push(Fixed("b", ProbeStatus::Warn));

        let report = suite.run(ctx()).await;
        assert_eq!(report.exit_code(), 0);
        assert_eq!(suite.results().len(), 2);
    }

    #[test]
    fn test_from_config_registers_chat_only_when_configured() {
        let config = SuiteConfig::default();
        assert_eq!(ProbeSuite::from_config(&config).len(), 4);

        let config = config.with_chat(crate::config::ChatConfig::default());
        assert_eq!(ProbeSuite::from_config(&config).len(), 10);
    }
}
