//! Claude CLI invocation: executable discovery and argument construction.
//!
//! The argument skeleton is fixed — prompt, stream-json output, verbosity,
//! permission mode, optional `--resume` — with caller passthrough arguments
//! appended last so they can override any built-in default.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::GlobalConfig;
use crate::{AppError, Result};

/// Locate the claude executable.
///
/// A `name` containing a path separator is used as-is; otherwise each `PATH`
/// entry is scanned. Symlinks are resolved to the real binary when possible.
///
/// # Errors
///
/// Returns [`AppError::Spawn`] when no matching executable exists — fatal at
/// startup, per-task executions never re-discover.
pub fn find_claude_bin(name: &str) -> Result<PathBuf> {
    let candidate = if name.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(name);
        path.is_file().then_some(path)
    } else {
        env::var_os("PATH").and_then(|paths| {
            env::split_paths(&paths)
                .map(|dir| dir.join(name))
                .find(|path| path.is_file())
        })
    };

    match candidate {
        Some(path) => Ok(path.canonicalize().unwrap_or(path)),
        None => Err(AppError::Spawn(format!(
            "could not find {name} executable; install it with: npm install -g @anthropic-ai/claude-code"
        ))),
    }
}

/// Build the claude argument vector for one task execution.
///
/// `resume_session` must be the registry's handle for the task's context —
/// passed iff a handle exists. Passthrough arguments come last by contract.
#[must_use]
pub fn build_claude_args(
    prompt: &str,
    resume_session: Option<&str>,
    config: &GlobalConfig,
) -> Vec<String> {
    let mut args = vec![
        "-p".to_owned(),
        prompt.to_owned(),
        "--output-format".to_owned(),
        "stream-json".to_owned(),
        "--verbose".to_owned(),
        "--permission-mode".to_owned(),
        config.permission_mode.clone(),
    ];

    if let Some(session) = resume_session {
        args.push("--resume".to_owned());
        args.push(session.to_owned());
    }

    args.extend(config.claude_args.iter().cloned());
    args
}

/// Build the subprocess command: bound to the workspace, stdin disabled,
/// stdout/stderr piped, killed when the handle drops.
#[must_use]
pub fn build_command(claude_bin: &Path, args: &[String], workspace_root: &Path) -> Command {
    let mut cmd = Command::new(claude_bin);
    cmd.args(args)
        .current_dir(workspace_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}
