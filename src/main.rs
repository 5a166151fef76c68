#![forbid(unsafe_code)]

//! `claude-bridge` — A2A task server binary.
//!
//! Bootstraps configuration, locates the claude executable, discovers
//! workspace skills, and starts the HTTP task transport.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use claude_bridge::config::GlobalConfig;
use claude_bridge::executor::command::find_claude_bin;
use claude_bridge::executor::ClaudeExecutor;
use claude_bridge::protocol::board::TaskBoard;
use claude_bridge::protocol::card::AgentCard;
use claude_bridge::server::{self, AppState};
use claude_bridge::session::{InMemorySessionStore, SessionStore};
use claude_bridge::skills::load_skills;
use claude_bridge::trace::{SpanSink, TracingSpanSink};
use claude_bridge::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "claude-bridge", about = "A2A task server bridging the Claude Code CLI", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Interface the HTTP transport binds to.
    #[arg(long)]
    host: Option<String>,

    /// Port the HTTP transport listens on.
    #[arg(long)]
    port: Option<u16>,

    /// Workspace root the claude subprocess runs in.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Execution timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Mirror every raw agent output line to this NDJSON file.
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Agent name advertised on the agent card.
    #[arg(long)]
    agent_name: Option<String>,

    /// Permission mode forwarded to the claude CLI.
    #[arg(long)]
    permission_mode: Option<String>,

    /// Enable the trace emitter.
    #[arg(long)]
    telemetry: bool,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Passthrough arguments for the claude CLI (e.g. `-- --mcp-config x`).
    #[arg(last = true)]
    claude_args: Vec<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("claude-bridge server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration (CLI > env > file > defaults) ──
    let mut config = GlobalConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(workspace) = args.workspace {
        config.workspace_root = workspace;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_seconds = timeout;
    }
    if let Some(log_path) = args.log_path {
        config.log_path = Some(log_path);
    }
    if let Some(agent_name) = args.agent_name {
        config.agent_name = agent_name;
    }
    if let Some(mode) = args.permission_mode {
        config.permission_mode = mode;
    }
    if args.telemetry {
        config.telemetry = true;
    }
    config.claude_args.extend(args.claude_args);
    config.validate()?;
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Bootstrap the workspace and locate claude ──
    let workspace = config.workspace_root_abs();
    std::fs::create_dir_all(&workspace).map_err(|err| {
        AppError::Config(format!(
            "cannot create workspace {}: {err}",
            workspace.display()
        ))
    })?;

    let claude_bin = find_claude_bin(&config.claude_bin)?;
    info!(claude = %claude_bin.display(), "found claude executable");

    let skills = load_skills(&config.skills_dir());
    info!(count = skills.len(), "skills discovered");

    // ── Build shared application state ──
    let url = format!("http://{}:{}/", config.host, config.port);
    let card = AgentCard::new(&config.agent_name, url, skills);

    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let span_sink: Option<Arc<dyn SpanSink>> = config
        .telemetry
        .then(|| Arc::new(TracingSpanSink) as Arc<dyn SpanSink>);
    if span_sink.is_some() {
        info!("trace emitter enabled");
    }

    let executor = Arc::new(ClaudeExecutor::new(
        Arc::clone(&config),
        claude_bin,
        sessions,
        span_sink,
    ));

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        executor,
        board: Arc::new(TaskBoard::new()),
        card,
    });

    // ── Serve until interrupted ──
    let ct = CancellationToken::new();
    let shutdown_ct = ct.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_ct.cancel();
        }
    });

    server::serve(state, ct).await
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let result = match format {
        LogFormat::Text => fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
    };
    result.map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))
}
