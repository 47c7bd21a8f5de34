//! Suite configuration.
//!
//! Defaults reproduce the standard agent smoke run: `/health` and `/` are
//! required, `/api/plugins` and `/api/models` are optional. A YAML file can
//! replace any part of it; the CLI then layers its overrides on top through
//! the `with_*` builders.

use crate::scenario::{ChatScenario, KeywordSet};
use agentprobe_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_AGENT_NAME: &str = "Neurophoto";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHAT_POLL_MS: u64 = 500;
pub const DEFAULT_CHAT_USER_ID: &str = "agentprobe";

/// Full description of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub base_url: String,
    pub agent_name: String,
    pub http_timeout_secs: u64,
    /// Bearer token for the agent API. Never read from the suite file.
    #[serde(skip)]
    pub api_token: Option<String>,
    pub endpoints: Vec<EndpointCheck>,
    pub chat: Option<ChatConfig>,
    /// Extra regexes scrubbed from probe details.
    pub redact_patterns: Vec<String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            api_token: None,
            endpoints: default_endpoints(),
            chat: None,
            redact_patterns: Vec::new(),
        }
    }
}

/// One HTTP check with its candidate paths and tolerance policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCheck {
    pub name: String,
    /// Candidate paths, tried in order until one exists.
    pub paths: Vec<String>,
    /// Absent or unreachable required endpoints fail; optional ones warn.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub expect: Expectation,
}

impl EndpointCheck {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        required: bool,
        expect: Expectation,
    ) -> Self {
        Self {
            name: name.into(),
            paths: vec![path.into()],
            required,
            expect,
        }
    }

    /// Add a fallback path.
    pub fn or_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }
}

/// Shape a 2xx response must have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// Any 2xx response.
    #[default]
    Reachable,
    /// JSON object whose numeric `field` is greater than zero.
    AgentCount {
        #[serde(default = "default_count_field")]
        field: String,
    },
    /// HTML page, or a page containing `marker`.
    Html {
        #[serde(default = "default_html_marker")]
        marker: String,
    },
    /// JSON array of objects named by `field`; optionally one name must
    /// contain `contains`.
    NamedList {
        #[serde(default = "default_name_field")]
        field: String,
        #[serde(default)]
        contains: Option<String>,
    },
    /// JSON array of `{model_name, status}` objects.
    ModelList,
}

fn default_count_field() -> String {
    "agentCount".to_string()
}

fn default_html_marker() -> String {
    "ElizaOS".to_string()
}

fn default_name_field() -> String {
    "name".to_string()
}

/// The built-in endpoint checks.
pub fn default_endpoints() -> Vec<EndpointCheck> {
    vec![
        EndpointCheck::new(
            "Health Check",
            "/health",
            true,
            Expectation::AgentCount {
                field: default_count_field(),
            },
        ),
        EndpointCheck::new(
            "Web UI",
            "/",
            true,
            Expectation::Html {
                marker: default_html_marker(),
            },
        ),
        EndpointCheck::new(
            "Plugins",
            "/api/plugins",
            false,
            Expectation::NamedList {
                field: default_name_field(),
                contains: None,
            },
        ),
        EndpointCheck::new("Database", "/api/models", false, Expectation::ModelList),
    ]
}

/// Which built-in conversation to run when no scenarios are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioPreset {
    /// Photo-generation agent: model training and generation commands.
    #[default]
    Neurophoto,
    /// Message-relay agent: feed and broadcast commands.
    Relay,
}

impl FromStr for ScenarioPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "neurophoto" => Ok(ScenarioPreset::Neurophoto),
            "relay" | "kols" => Ok(ScenarioPreset::Relay),
            _ => Err(Error::Config(format!("Unknown chat preset: {}", s))),
        }
    }
}

impl ScenarioPreset {
    pub fn scenarios(&self) -> Vec<ChatScenario> {
        match self {
            ScenarioPreset::Neurophoto => neurophoto_scenarios(),
            ScenarioPreset::Relay => relay_scenarios(),
        }
    }
}

fn neurophoto_scenarios() -> Vec<ChatScenario> {
    let models = || {
        vec![
            KeywordSet::new(["model"]),
            KeywordSet::new(["модел"]),
        ]
    };

    vec![
        ChatScenario::new("/face train TestModel_2025", models()).named("Train model"),
        ChatScenario::new(
            "/neurophoto beautiful sunset",
            vec![
                KeywordSet::new(["no trained model"]),
                KeywordSet::new(["нет обученных моделей"]),
                KeywordSet::new(["моделей"]),
            ],
        )
        .named("Generate without model"),
        ChatScenario::new("/models", models()).named("List models"),
        ChatScenario::new("draw a futuristic city", models()).named("Free-form draw"),
        ChatScenario::new("создай изображение кота в космосе", models())
            .named("Free-form create"),
        ChatScenario::new("hello, how are you?", vec![]).named("Greeting"),
    ]
}

fn relay_scenarios() -> Vec<ChatScenario> {
    ["привет", "покажи сообщения", "что в группах?", "трансляция"]
        .into_iter()
        .map(|command| ChatScenario::new(command, vec![]))
        .collect()
}

/// Chat probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Relay base URL; the suite base URL when unset.
    pub url: Option<String>,
    /// Candidate relay paths, tried in order.
    pub paths: Vec<String>,
    pub user_id: String,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub preset: ScenarioPreset,
    /// Explicit scenarios; the preset is used when empty.
    pub scenarios: Vec<ChatScenario>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: None,
            paths: vec![
                "/message".to_string(),
                "/api/message".to_string(),
                "/chat".to_string(),
            ],
            user_id: DEFAULT_CHAT_USER_ID.to_string(),
            timeout_secs: DEFAULT_CHAT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_CHAT_POLL_MS,
            preset: ScenarioPreset::default(),
            scenarios: Vec::new(),
        }
    }
}

impl ChatConfig {
    /// Scenarios to run, in order.
    pub fn effective_scenarios(&self) -> Vec<ChatScenario> {
        if self.scenarios.is_empty() {
            self.preset.scenarios()
        } else {
            self.scenarios.clone()
        }
    }
}

impl SuiteConfig {
    /// Load a suite from a YAML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: SuiteConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = agent_name.into();
        self
    }

    pub fn with_http_timeout(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Require every name-list check to report a name containing `plugin`.
    pub fn with_expected_plugin(mut self, plugin: impl Into<String>) -> Self {
        let plugin = plugin.into();
        for check in &mut self.endpoints {
            if let Expectation::NamedList { contains, .. } = &mut check.expect {
                *contains = Some(plugin.clone());
            }
        }
        self
    }

    pub fn with_chat(mut self, chat: ChatConfig) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Check the suite is runnable.
    pub fn validate(&self) -> Result<()> {
        if self.http_timeout_secs == 0 {
            return Err(Error::Config("http_timeout_secs must be positive".to_string()));
        }

        for check in &self.endpoints {
            if check.name.trim().is_empty() {
                return Err(Error::Config("endpoint check without a name".to_string()));
            }
            if check.paths.is_empty() {
                return Err(Error::Config(format!(
                    "endpoint check '{}' has no paths",
                    check.name
                )));
            }
        }

        if let Some(chat) = &self.chat {
            if chat.paths.is_empty() {
                return Err(Error::Config("chat section has no relay paths".to_string()));
            }
            if chat.timeout_secs == 0 {
                return Err(Error::Config("chat timeout_secs must be positive".to_string()));
            }
            if chat.scenarios.iter().any(|s| s.command.trim().is_empty()) {
                return Err(Error::Config("chat scenario with an empty command".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_mark_health_and_ui_required() {
        let config = SuiteConfig::default();
        let required: Vec<_> = config
            .endpoints
            .iter()
            .map(|c| (c.name.as_str(), c.required))
            .collect();
        assert_eq!(
            required,
            vec![
                ("Health Check", true),
                ("Web UI", true),
                ("Plugins", false),
                ("Database", false),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_suite() {
        let yaml = r#"
base_url: http://agent.internal:3000
endpoints:
  - name: Health
    paths: [/health, /api/health]
    required: true
    expect:
      kind: agent_count
  - name: Plugins
    paths: [/api/plugins]
    expect:
      kind: named_list
      contains: neurophoto
chat:
  preset: relay
  timeout_secs: 10
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url, "http://agent.internal:3000");
        assert_eq!(config.agent_name, DEFAULT_AGENT_NAME);
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].paths, vec!["/health", "/api/health"]);
        assert_eq!(
            config.endpoints[0].expect,
            Expectation::AgentCount {
                field: "agentCount".to_string()
            }
        );
        assert!(!config.endpoints[1].required);

        let chat = config.chat.unwrap();
        assert_eq!(chat.preset, ScenarioPreset::Relay);
        assert_eq!(chat.paths.len(), 3);
        assert_eq!(chat.effective_scenarios().len(), 4);
    }

    #[test]
    fn test_token_is_never_read_from_file() {
        let yaml = "api_token: leaked-secret\n";
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "agent_name: KOLS").unwrap();
        writeln!(file, "http_timeout_secs: 2").unwrap();

        let config = SuiteConfig::load(file.path()).unwrap();
        assert_eq!(config.agent_name, "KOLS");
        assert_eq!(config.http_timeout_secs, 2);
        assert_eq!(config.endpoints.len(), 4);
    }

    #[test]
    fn test_validate_rejects_empty_paths() {
        let yaml = r#"
endpoints:
  - name: Health
    paths: []
"#;
        assert!(matches!(
            SuiteConfig::from_yaml(yaml),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_with_expected_plugin_only_touches_name_lists() {
        let config = SuiteConfig::default().with_expected_plugin("neurophoto");
        let plugins = &config.endpoints[2];
        assert_eq!(
            plugins.expect,
            Expectation::NamedList {
                field: "name".to_string(),
                contains: Some("neurophoto".to_string()),
            }
        );
        assert_eq!(config.endpoints[3].expect, Expectation::ModelList);
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("KOLS".parse::<ScenarioPreset>().unwrap(), ScenarioPreset::Relay);
        assert_eq!(
            "neurophoto".parse::<ScenarioPreset>().unwrap(),
            ScenarioPreset::Neurophoto
        );
        assert!("other".parse::<ScenarioPreset>().is_err());
    }

    #[test]
    fn test_explicit_scenarios_override_preset() {
        let chat = ChatConfig {
            scenarios: vec![ChatScenario::new("/models", vec![])],
            ..Default::default()
        };
        assert_eq!(chat.effective_scenarios().len(), 1);
        assert_eq!(ChatConfig::default().effective_scenarios().len(), 6);
    }

    #[test]
    fn test_free_form_commands_hit_generation_intents() {
        // Phrases the photo agent's generate action listens for.
        let intents = [
            "нарисуй",
            "создай изображение",
            "сгенерируй",
            "сделай картинк",
            "хочу фото",
            "сделай фото",
            "generate image",
            "create image",
            "draw",
            "make a picture",
            "make an image",
        ];

        let free_form: Vec<ChatScenario> = ScenarioPreset::Neurophoto
            .scenarios()
            .into_iter()
            .filter(|s| s.display_name().starts_with("Free-form"))
            .collect();
        assert_eq!(free_form.len(), 2);

        for scenario in free_form {
            let command = scenario.command.to_lowercase();
            assert!(
                intents.iter().any(|intent| command.contains(intent)),
                "{} does not trigger image generation",
                scenario.command
            );
        }
    }
}
