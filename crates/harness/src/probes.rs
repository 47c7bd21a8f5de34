//! HTTP endpoint probes.

use crate::config::{EndpointCheck, Expectation};
use crate::probe::{Probe, ProbeContext, Verdict};
use crate::transport::{Body, HttpOutcome};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// How many models to list in a detail line.
const MODELS_SHOWN: usize = 3;

/// Probe for one [`EndpointCheck`].
pub struct EndpointProbe {
    check: EndpointCheck,
}

impl EndpointProbe {
    pub fn new(check: EndpointCheck) -> Self {
        Self { check }
    }
}

#[async_trait]
impl Probe for EndpointProbe {
    fn name(&self) -> &str {
        &self.check.name
    }

    async fn run(&self, ctx: &ProbeContext) -> anyhow::Result<Verdict> {
        let outcome = ctx
            .http
            .first_available(Method::GET, &self.check.paths, None)
            .await;
        Ok(classify(&self.check, &outcome))
    }
}

/// Turn an HTTP outcome into a verdict for `check`.
pub fn classify(check: &EndpointCheck, outcome: &HttpOutcome) -> Verdict {
    match outcome {
        HttpOutcome::Timeout { .. } => Verdict::fail(outcome.to_string()),
        HttpOutcome::Response { path, body, .. } if outcome.is_success() => {
            check_shape(&check.expect, path, body)
        }
        _ if check.required => Verdict::fail(outcome.to_string()),
        _ => Verdict::warn(format!("{} (optional endpoint, tolerated)", outcome)),
    }
}

fn check_shape(expect: &Expectation, path: &str, body: &Body) -> Verdict {
    match expect {
        Expectation::Reachable => Verdict::pass(format!("{} reachable", path)),

        Expectation::AgentCount { field } => {
            let count = body
                .json()
                .and_then(|v| v.get(field.as_str()))
                .and_then(Value::as_f64);
            match count {
                Some(n) if n > 0.0 => Verdict::pass(format!("{} = {}", field, n)),
                Some(n) => Verdict::fail(format!("{} = {}, no active agents", field, n)),
                None => mismatch(format!("no numeric '{}' field", field), body),
            }
        }

        Expectation::Html { marker } => {
            let text = body.text();
            if text.contains(marker.as_str()) || text.to_lowercase().contains("<html") {
                Verdict::pass(format!("{} serves a web page", path))
            } else {
                mismatch("no HTML in response".to_string(), body)
            }
        }

        Expectation::NamedList { field, contains } => {
            let Some(items) = body.json().and_then(Value::as_array) else {
                return mismatch("expected a JSON array".to_string(), body);
            };
            let names: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get(field.as_str()).and_then(Value::as_str))
                .collect();
            let listed = format!("{} entries: {}", items.len(), names.join(", "));

            match contains {
                Some(wanted) => {
                    let wanted_lower = wanted.to_lowercase();
                    if names.iter().any(|n| n.to_lowercase().contains(&wanted_lower)) {
                        Verdict::pass(format!("'{}' loaded; {}", wanted, listed))
                    } else {
                        Verdict::fail(format!("'{}' not found; {}", wanted, listed))
                    }
                }
                None => Verdict::pass(listed),
            }
        }

        Expectation::ModelList => {
            let Some(models) = body.json().and_then(Value::as_array) else {
                return mismatch("expected a JSON array".to_string(), body);
            };
            let shown: Vec<String> = models
                .iter()
                .take(MODELS_SHOWN)
                .map(|m| {
                    let name = m.get("model_name").and_then(Value::as_str).unwrap_or("unknown");
                    let status = m.get("status").and_then(Value::as_str).unwrap_or("unknown");
                    format!("{} - {}", name, status)
                })
                .collect();
            if shown.is_empty() {
                Verdict::pass("0 models")
            } else {
                Verdict::pass(format!("{} models: {}", models.len(), shown.join("; ")))
            }
        }
    }
}

fn mismatch(reason: String, body: &Body) -> Verdict {
    let text = body.text();
    let actual: String = text.chars().take(200).collect();
    Verdict::fail(format!("{}; got: {}", reason, actual))
}
