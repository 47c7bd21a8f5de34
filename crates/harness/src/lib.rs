//! AgentProbe harness - smoke tests for black-box conversational agent services.
//!
//! A run is a [`ProbeSuite`]: an ordered list of probes executed one after
//! another against a [`ProbeContext`], producing a [`Report`] whose exit code
//! is the only contract the harness exposes besides its console output.

pub mod chat;
pub mod config;
pub mod probe;
pub mod probes;
pub mod report;
pub mod scenario;
pub mod suite;
pub mod transport;

pub use chat::{ChatMessage, ChatTransport, HttpChatTransport};
pub use config::{ChatConfig, EndpointCheck, Expectation, ScenarioPreset, SuiteConfig};
pub use probe::{Probe, ProbeContext, ProbeResult, ProbeStatus, Verdict};
pub use report::{Report, ReportFormat, Summary};
pub use scenario::{ChatScenario, KeywordSet};
pub use suite::ProbeSuite;
pub use transport::{Body, HttpOutcome, HttpTransport};
