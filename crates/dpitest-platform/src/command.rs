//! Structured process invocation
//!
//! Every external command is an argument vector, never a shell string, so
//! nothing the engine writes can be reinterpreted by a shell. Privileged
//! commands receive their credential over stdin; the secret never appears in
//! an argument list or a log line. Every invocation carries a hard
//! wall-clock budget: a missed timeout is a failure, not a hang.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::trace;

use crate::error::{Error, Result};

/// Secret for the privilege-elevation wrapper
///
/// Deliberately opaque: no `Display`, and `Debug` is redacted.
#[derive(Clone)]
pub struct Credentials {
    secret: String,
}

impl Credentials {
    /// Wrap a secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn stdin_payload(&self) -> String {
        format!("{}\n", self.secret)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// One command to run: program, argument vector, optional stdin payload
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    stdin_input: Option<String>,
}

impl CommandSpec {
    /// Command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin_input: None,
        }
    }

    /// Append arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument vector
    pub fn arg_slice(&self) -> &[String] {
        &self.args
    }

    /// Wrap for privilege elevation, delivering the credential via stdin
    ///
    /// On Unix this becomes `sudo -S -p '' -- <program> <args>`; on Windows
    /// the process is expected to already run elevated and the spec is
    /// returned unchanged.
    pub fn elevated(self, credentials: &Credentials) -> Self {
        #[cfg(windows)]
        {
            let _ = credentials;
            self
        }
        #[cfg(not(windows))]
        {
            let mut args = vec![
                "-S".to_string(),
                "-p".to_string(),
                String::new(),
                "--".to_string(),
                self.program,
            ];
            args.extend(self.args);
            Self {
                program: "sudo".to_string(),
                args,
                stdin_input: Some(credentials.stdin_payload()),
            }
        }
    }
}

/// Captured result of one finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Whether the exit status was success
    pub success: bool,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

/// Run a command to completion within the budget
///
/// The child is killed if the budget elapses. A non-zero exit is returned as
/// a normal `CommandOutput`, not an error; callers decide what failure means.
pub async fn run(spec: &CommandSpec, budget: Duration) -> Result<CommandOutput> {
    trace!(program = %spec.program, args = ?spec.args, "Running command");

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command.stdin(if spec.stdin_input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = command
        .spawn()
        .map_err(|e| Error::spawn(&spec.program, e.to_string()))?;

    if let Some(input) = &spec.stdin_input {
        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits early closes its stdin; that is its answer
            let _ = stdin.write_all(input.as_bytes()).await;
            let _ = stdin.shutdown().await;
        }
    }

    let output = match tokio::time::timeout(budget, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(Error::spawn(&spec.program, e.to_string())),
        Err(_) => {
            return Err(Error::Timeout {
                program: spec.program.clone(),
                seconds: budget.as_secs(),
            })
        }
    };

    Ok(CommandOutput {
        code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
