//! Shell command execution utilities.
//!
//! Router CLI sessions are driven by running the system `ssh` client with
//! the CLI script written to its stdin. This module wraps that in a small
//! async API and provides quoting for values interpolated into commands.
//!
//! # Example
//!
//! ```ignore
//! use natmgr_common::shell::{self, SSH_CMD, shellquote};
//!
//! let cmd = format!("{} -T {}", SSH_CMD, shellquote("admin@192.168.1.1"));
//! let result = shell::exec_with_input(&cmd, "display nat server\n", &[]).await?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{NatMgrError, NatMgrResult};

/// Path to the OpenSSH client.
pub const SSH_CMD: &str = "/usr/bin/ssh";

/// Path to `sshpass`, used for password authentication.
pub const SSHPASS_CMD: &str = "/usr/bin/sshpass";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// Wraps the string in double quotes and escapes `$`, `` ` ``, `"`, `\`
/// and newline.
///
/// # Example
///
/// ```
/// use natmgr_common::shell::shellquote;
///
/// assert_eq!(shellquote("admin"), "\"admin\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// The stdout output.
    pub stdout: String,
    /// The stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes a shell command asynchronously with no stdin.
pub async fn exec(cmd: &str) -> NatMgrResult<ExecResult> {
    run(cmd, None, &[]).await
}

/// Executes a shell command, writing `input` to its stdin.
///
/// `envs` are added to the child's environment only, so secrets passed this
/// way never show up in the command line or in logs.
pub async fn exec_with_input(
    cmd: &str,
    input: &str,
    envs: &[(&str, &str)],
) -> NatMgrResult<ExecResult> {
    run(cmd, Some(input), envs).await
}

/// Executes a shell command and returns an error on non-zero exit.
///
/// # Returns
///
/// * `Ok(String)` - The stdout output on success
/// * `Err(NatMgrError)` - If the command fails or returns non-zero
pub async fn exec_or_throw(cmd: &str) -> NatMgrResult<String> {
    into_stdout(cmd, exec(cmd).await?)
}

/// Like [`exec_or_throw`], with a stdin script and extra environment.
pub async fn exec_or_throw_with_input(
    cmd: &str,
    input: &str,
    envs: &[(&str, &str)],
) -> NatMgrResult<String> {
    into_stdout(cmd, exec_with_input(cmd, input, envs).await?)
}

fn into_stdout(cmd: &str, result: ExecResult) -> NatMgrResult<String> {
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(NatMgrError::ShellCommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}

async fn run(cmd: &str, input: Option<&str>, envs: &[(&str, &str)]) -> NatMgrResult<ExecResult> {
    tracing::debug!(
        command = %cmd,
        stdin_bytes = input.map_or(0, str::len),
        "Executing shell command"
    );

    let spawn_err = |e| NatMgrError::ShellExec {
        command: cmd.to_string(),
        source: e,
    };

    let mut command = Command::new("/bin/sh");
    command
        .arg("-c")
        .arg(cmd)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in envs {
        command.env(key, value);
    }

    let mut child = command.spawn().map_err(spawn_err)?;

    if let (Some(script), Some(mut stdin)) = (input, child.stdin.take()) {
        match stdin.write_all(script.as_bytes()).await {
            // The child may exit before consuming its input; its exit code tells the story.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            other => other.map_err(spawn_err)?,
        }
        // Dropping stdin closes the pipe so the remote CLI sees EOF.
        drop(stdin);
    }

    let output = child.wait_with_output().await.map_err(spawn_err)?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let result = ExecResult {
        exit_code,
        stdout,
        stderr,
    };

    if result.success() {
        tracing::trace!(command = %cmd, exit_code = exit_code, "Command succeeded");
    } else {
        tracing::warn!(
            command = %cmd,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shellquote_simple() {
        assert_eq!(shellquote("simple"), "\"simple\"");
        assert_eq!(shellquote("admin@192.168.1.1"), "\"admin@192.168.1.1\"");
    }

    #[test]
    fn test_shellquote_special_chars() {
        assert_eq!(shellquote("$HOME"), "\"\\$HOME\"");
        assert_eq!(shellquote("`whoami`"), "\"\\`whoami\\`\"");
        assert_eq!(shellquote("say \"hello\""), "\"say \\\"hello\\\"\"");
        assert_eq!(shellquote("path\\to"), "\"path\\\\to\"");
        assert_eq!(shellquote("line1\nline2"), "\"line1\\\nline2\"");
    }

    #[test]
    fn test_shellquote_empty() {
        assert_eq!(shellquote(""), "\"\"");
    }

    #[test]
    fn test_exec_result_combined() {
        let result = ExecResult {
            exit_code: 0,
            stdout: "stdout".to_string(),
            stderr: "stderr".to_string(),
        };
        assert!(result.success());
        assert_eq!(result.combined_output(), "stdout\nstderr");

        let failed = ExecResult {
            exit_code: 1,
            stdout: "".to_string(),
            stderr: "error message".to_string(),
        };
        assert!(!failed.success());
        assert_eq!(failed.combined_output(), "error message");
    }

    #[tokio::test]
    async fn test_exec_echo() {
        let result = exec("echo hello").await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "hello");
    }

    #[tokio::test]
    async fn test_exec_with_input_reads_stdin() {
        let result = exec_with_input("cat", "display nat server\n", &[])
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "display nat server");
    }

    #[tokio::test]
    async fn test_exec_with_input_passes_env() {
        let output = exec_or_throw_with_input(
            "cat >/dev/null; echo $NATMGR_TEST",
            "",
            &[("NATMGR_TEST", "ok")],
        )
        .await
        .unwrap();
        assert_eq!(output, "ok");
    }

    #[tokio::test]
    async fn test_exec_or_throw_failure() {
        let result = exec_or_throw("exit 3").await;
        match result {
            Err(NatMgrError::ShellCommandFailed { exit_code, .. }) => {
                assert_eq!(exit_code, 3);
            }
            _ => panic!("Expected ShellCommandFailed error"),
        }
    }
}
