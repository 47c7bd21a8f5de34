//! Report generation.

use crate::probe::{ProbeResult, ProbeStatus};
use agentprobe_common::{Error, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

/// Counts derived from the results at report time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub errored: usize,
}

impl Summary {
    pub fn from_results(results: &[ProbeResult]) -> Self {
        let mut summary = Summary {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.status() {
                ProbeStatus::Passed => summary.passed += 1,
                ProbeStatus::Warn => summary.warned += 1,
                ProbeStatus::Failed => summary.failed += 1,
                ProbeStatus::Error => summary.errored += 1,
            }
        }
        summary
    }

    /// Passed plus tolerated warnings.
    pub fn ok(&self) -> usize {
        self.passed + self.warned
    }

    pub fn all_ok(&self) -> bool {
        self.failed + self.errored == 0
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub target: String,
    pub agent_name: String,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub summary: Summary,
    pub results: Vec<ProbeResult>,
}

impl Report {
    pub fn new(
        target: &str,
        agent_name: &str,
        started_at: Timestamp,
        finished_at: Timestamp,
        results: Vec<ProbeResult>,
    ) -> Self {
        Self {
            target: target.to_string(),
            agent_name: agent_name.to_string(),
            started_at,
            finished_at,
            summary: Summary::from_results(&results),
            results,
        }
    }

    /// 0 when no probe failed or errored, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.summary.all_ok() {
            0
        } else {
            1
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    /// Save the JSON form of the report.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== AgentProbe Report ===\n");
        let _ = writeln!(out, "Agent:  {}", self.agent_name);
        let _ = writeln!(out, "Target: {}", self.target);
        let _ = writeln!(
            out,
            "Time:   {:.2}s\n",
            self.started_at.millis_until(&self.finished_at) as f64 / 1000.0
        );

        let _ = writeln!(out, "{:-<80}", "");
        let _ = writeln!(out, "{:<4} {:<40} {:>10} {:>12}", "", "Probe", "Status", "Time(ms)");
        let _ = writeln!(out, "{:-<80}", "");
        for result in &self.results {
            let name: String = result.name().chars().take(40).collect();
            let _ = writeln!(
                out,
                "{:<4} {:<40} {:>10} {:>12}",
                marker(result.status()),
                name,
                result.status(),
                result.duration_ms()
            );
            if !result.detail().is_empty() {
                let _ = writeln!(out, "       {}", result.detail());
            }
        }
        let _ = writeln!(out, "{:-<80}", "");

        let s = &self.summary;
        let _ = writeln!(
            out,
            "\nSummary: {} passed, {} warned, {} failed, {} errored ({} total)",
            s.passed, s.warned, s.failed, s.errored, s.total
        );
        let _ = writeln!(out, "Success: {}/{} probes", s.ok(), s.total);
        if s.all_ok() {
            let _ = writeln!(out, "\nAll probes passed.");
        } else {
            let _ = writeln!(out, "\nSome probes failed. Check the agent logs.");
        }
        out
    }
}

fn marker(status: ProbeStatus) -> &'static str {
    match status {
        ProbeStatus::Passed => "[+]",
        ProbeStatus::Warn => "[~]",
        ProbeStatus::Failed => "[x]",
        ProbeStatus::Error => "[!]",
    }
}

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(Error::Config(format!("Unknown report format: {}", s))),
        }
    }
}
