//! AgentProbe - smoke tests for conversational agent services.

use agentprobe_harness::{ProbeContext, ProbeSuite, ReportFormat, ScenarioPreset, SuiteConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "agentprobe")]
#[command(
    author,
    version,
    about = "Probe a running agent service and report what works"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// YAML suite file (endpoints, chat scenarios)
    #[arg(long, env = "AGENTPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the agent service [default: http://localhost:3000]
    #[arg(long, env = "AGENTPROBE_BASE_URL")]
    base_url: Option<String>,

    /// Display name of the agent under test
    #[arg(long, env = "AGENTPROBE_AGENT_NAME")]
    agent_name: Option<String>,

    /// Per-request HTTP timeout in seconds [default: 5]
    #[arg(long, env = "AGENTPROBE_HTTP_TIMEOUT")]
    http_timeout: Option<u64>,

    /// Bearer token for the agent API
    #[arg(long, env = "AGENTPROBE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Plugin name that must appear in the plugin list
    #[arg(long, env = "AGENTPROBE_EXPECT_PLUGIN")]
    expect_plugin: Option<String>,

    /// Run chat scenarios against the base URL's message relay
    #[arg(long, env = "AGENTPROBE_CHAT")]
    chat: bool,

    /// Message relay base URL; implies --chat
    #[arg(long, env = "AGENTPROBE_CHAT_URL")]
    chat_url: Option<String>,

    /// Built-in chat scenarios (neurophoto, relay); implies --chat
    #[arg(long, env = "AGENTPROBE_CHAT_PRESET")]
    chat_preset: Option<String>,

    /// User id sent with chat messages
    #[arg(long, env = "AGENTPROBE_CHAT_USER_ID")]
    chat_user_id: Option<String>,

    /// Seconds to wait for a chat reply [default: 30]
    #[arg(long, env = "AGENTPROBE_CHAT_TIMEOUT")]
    chat_timeout: Option<u64>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,

    /// Also write the JSON report to this file
    #[arg(long)]
    report_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the report.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let code = run_until(run(cli), interrupted()).await;
    std::process::exit(code);
}

/// Exit code of `run`, or 1 if `interrupt` resolves first or `run` fails.
async fn run_until<R, I>(run: R, interrupt: I) -> i32
where
    R: Future<Output = Result<i32>>,
    I: Future<Output = ()>,
{
    tokio::select! {
        result = run => match result {
            Ok(code) => code,
            Err(e) => {
                error!("agentprobe failed: {:#}", e);
                eprintln!("\nFatal error: {:#}", e);
                1
            }
        },
        _ = interrupt => {
            eprintln!("\nProbe run interrupted by user.");
            1
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be watched.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let format: ReportFormat = cli.format.parse()?;
    let config = build_config(&cli)?;

    info!("Target: {} ({})", config.base_url, config.agent_name);

    let ctx = ProbeContext::from_config(&config).context("Failed to set up transports")?;
    let ctx = Arc::new(ctx);
    let mut suite = ProbeSuite::from_config(&config);
    let report = suite.run(ctx).await;

    println!("{}", report.render(format)?);

    if let Some(path) = &cli.report_out {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        info!("Report written to {:?}", path);
    }

    Ok(report.exit_code())
}

/// Suite file (or defaults) with command-line overrides applied.
fn build_config(cli: &Cli) -> Result<SuiteConfig> {
    let mut config = match &cli.config {
        Some(path) => SuiteConfig::load(path)
            .with_context(|| format!("Failed to load suite file {:?}", path))?,
        None => SuiteConfig::default(),
    };

    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(agent_name) = &cli.agent_name {
        config = config.with_agent_name(agent_name.clone());
    }
    if let Some(secs) = cli.http_timeout {
        config = config.with_http_timeout(secs);
    }
    if let Some(plugin) = &cli.expect_plugin {
        config = config.with_expected_plugin(plugin.clone());
    }
    config = config.with_api_token(cli.api_token.clone());

    let wants_chat = cli.chat || cli.chat_url.is_some() || cli.chat_preset.is_some();
    if wants_chat || config.chat.is_some() {
        let mut chat = config.chat.take().unwrap_or_default();
        if let Some(url) = &cli.chat_url {
            chat.url = Some(url.clone());
        }
        if let Some(preset) = &cli.chat_preset {
            chat.preset = preset.parse::<ScenarioPreset>()?;
        }
        if let Some(user_id) = &cli.chat_user_id {
            chat.user_id = user_id.clone();
        }
        if let Some(secs) = cli.chat_timeout {
            chat.timeout_secs = secs;
        }
        config = config.with_chat(chat);
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes tests that read or set AGENTPROBE_* variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["agentprobe"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_no_arguments_uses_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let cli = parse(&[]);
        assert_eq!(cli.format, "text");
        assert!(!cli.chat);

        let config = build_config(&cli).unwrap();
        assert_eq!(config.endpoints.len(), 4);
    }

    #[test]
    fn test_overrides_apply() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let cli = parse(&[
            "--base-url",
            "http://agent:3002",
            "--agent-name",
            "KOLS",
            "--chat-preset",
            "relay",
            "--chat-timeout",
            "10",
            "--expect-plugin",
            "telegram",
        ]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.base_url, "http://agent:3002");
        assert_eq!(config.agent_name, "KOLS");
        let chat = config.chat.unwrap();
        assert_eq!(chat.preset, ScenarioPreset::Relay);
        assert_eq!(chat.timeout_secs, 10);
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let cli = parse(&["--chat-preset", "bogus"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_environment_enables_chat_and_timeouts() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("AGENTPROBE_CHAT", "true");
        std::env::set_var("AGENTPROBE_HTTP_TIMEOUT", "7");
        std::env::set_var("AGENTPROBE_CHAT_TIMEOUT", "12");
        let cli = Cli::try_parse_from(["agentprobe"]);
        std::env::remove_var("AGENTPROBE_CHAT");
        std::env::remove_var("AGENTPROBE_HTTP_TIMEOUT");
        std::env::remove_var("AGENTPROBE_CHAT_TIMEOUT");

        let config = build_config(&cli.unwrap()).unwrap();
        assert_eq!(config.http_timeout_secs, 7);
        let chat = config.chat.unwrap();
        assert_eq!(chat.timeout_secs, 12);
        assert_eq!(chat.preset, ScenarioPreset::Neurophoto);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!("yaml".parse::<ReportFormat>().is_err());
    }

    #[tokio::test]
    async fn test_interrupt_exits_with_failure() {
        let code = run_until(std::future::pending::<Result<i32>>(), async {}).await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_run_until_returns_run_exit_code() {
        let pending = std::future::pending::<()>;
        assert_eq!(run_until(async { Ok(0) }, pending()).await, 0);
        assert_eq!(run_until(async { Err(anyhow::anyhow!("boom")) }, pending()).await, 1);
    }
}
