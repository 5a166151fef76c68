//! Global configuration: layered loading with CLI flags > environment > file > defaults.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    2222
}

fn default_timeout_seconds() -> u64 {
    3600
}

fn default_permission_mode() -> String {
    "acceptEdits".into()
}

fn default_claude_bin() -> String {
    "claude".into()
}

fn default_agent_name() -> String {
    "claude-bridge".into()
}

/// Detect whether the server runs inside a container (Docker or Podman).
fn is_container() -> bool {
    Path::new("/.dockerenv").exists() || Path::new("/run/.containerenv").exists()
}

fn default_workspace_root() -> PathBuf {
    if is_container() {
        PathBuf::from("/workspace")
    } else {
        PathBuf::from("./workspace")
    }
}

/// Global configuration parsed from an optional `config.toml`, then layered
/// with environment variables and CLI flags.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct GlobalConfig {
    /// Interface the HTTP transport binds to.
    pub host: String,
    /// Port the HTTP transport listens on.
    pub port: u16,
    /// Working directory the claude subprocess is bound to.
    pub workspace_root: PathBuf,
    /// Hard wall-clock limit for one task execution, in seconds.
    pub timeout_seconds: u64,
    /// Permission mode forwarded to the claude CLI.
    pub permission_mode: String,
    /// Name of the claude executable looked up on `PATH`.
    pub claude_bin: String,
    /// Passthrough arguments appended after the built-in defaults so they
    /// can override them (e.g. `--mcp-config`).
    pub claude_args: Vec<String>,
    /// Optional NDJSON mirror file for every raw agent output line.
    pub log_path: Option<PathBuf>,
    /// Agent name advertised on the agent card.
    pub agent_name: String,
    /// Whether the trace emitter runs alongside task execution.
    pub telemetry: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workspace_root: default_workspace_root(),
            timeout_seconds: default_timeout_seconds(),
            permission_mode: default_permission_mode(),
            claude_bin: default_claude_bin(),
            claude_args: Vec::new(),
            log_path: None,
            agent_name: default_agent_name(),
            telemetry: false,
        }
    }
}

impl GlobalConfig {
    /// Parse configuration from a TOML string and validate it.
    ///
    /// Unset keys fall back to their defaults, so an empty string yields the
    /// default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when the TOML is malformed or a value
    /// fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional file path, then layer environment
    /// variables on top.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when the file cannot be read or parsed,
    /// or when an environment override is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|err| {
                    AppError::Config(format!("cannot read config {}: {err}", p.display()))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Layer environment variables over the current values.
    ///
    /// Recognized variables: `BRIDGE_HOST`, `BRIDGE_PORT`,
    /// `CLAUDE_WORKSPACE_DIR`, `CLAUDE_TIMEOUT_SECONDS`, `CLAUDE_LOG_PATH`,
    /// `CLAUDE_AGENT_NAME`, `CLAUDE_PERMISSION_MODE`, `BRIDGE_TELEMETRY`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when a numeric variable fails to parse.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = env::var("BRIDGE_HOST") {
            if !host.is_empty() {
                self.host = host;
            }
        }
        if let Ok(port) = env::var("BRIDGE_PORT") {
            self.port = port
                .parse()
                .map_err(|_| AppError::Config(format!("invalid BRIDGE_PORT: {port}")))?;
        }
        if let Ok(dir) = env::var("CLAUDE_WORKSPACE_DIR") {
            if !dir.is_empty() {
                self.workspace_root = PathBuf::from(dir);
            }
        }
        if let Ok(secs) = env::var("CLAUDE_TIMEOUT_SECONDS") {
            self.timeout_seconds = secs
                .parse()
                .map_err(|_| AppError::Config(format!("invalid CLAUDE_TIMEOUT_SECONDS: {secs}")))?;
        }
        if let Ok(path) = env::var("CLAUDE_LOG_PATH") {
            if !path.is_empty() {
                self.log_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(name) = env::var("CLAUDE_AGENT_NAME") {
            if !name.is_empty() {
                self.agent_name = name;
            }
        }
        if let Ok(mode) = env::var("CLAUDE_PERMISSION_MODE") {
            if !mode.is_empty() {
                self.permission_mode = mode;
            }
        }
        if let Ok(flag) = env::var("BRIDGE_TELEMETRY") {
            self.telemetry = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
        Ok(())
    }

    /// Validate invariants that the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when a value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(AppError::Config("timeout_seconds must be positive".into()));
        }
        if self.permission_mode.is_empty() {
            return Err(AppError::Config("permission_mode must not be empty".into()));
        }
        if self.claude_bin.is_empty() {
            return Err(AppError::Config("claude_bin must not be empty".into()));
        }
        Ok(())
    }

    /// Absolute workspace root, resolved against the current directory when
    /// the configured path is relative.
    #[must_use]
    pub fn workspace_root_abs(&self) -> PathBuf {
        if self.workspace_root.is_absolute() {
            self.workspace_root.clone()
        } else {
            env::current_dir()
                .map(|cwd| cwd.join(&self.workspace_root))
                .unwrap_or_else(|_| self.workspace_root.clone())
        }
    }

    /// Directory scanned for skill definitions (`<workspace>/.claude/skills`).
    #[must_use]
    pub fn skills_dir(&self) -> PathBuf {
        self.workspace_root_abs().join(".claude").join("skills")
    }
}
