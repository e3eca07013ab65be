//! Process runner for the device-management tool.
//!
//! `CommandRunner` is the seam the adb driver talks through. `AdbRunner`
//! spawns the real executable with `tokio::process`; tests use a scripted
//! runner that records argument lists and replays canned output.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::{AppError, Result};

/// The one stderr message adb emits on success.
const BENIGN_STDERR: &str = "daemon started successfully";

/// Executes one invocation of the external tool and returns its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[&str]) -> Result<String>;
}

/// Production runner that spawns the configured executable directly.
#[derive(Debug, Clone)]
pub struct AdbRunner {
    program: String,
    timeout: Option<Duration>,
}

impl AdbRunner {
    #[must_use]
    pub const fn new(program: String, timeout: Option<Duration>) -> Self {
        Self { program, timeout }
    }

    fn command_line(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl CommandRunner for AdbRunner {
    async fn run(&self, args: &[&str]) -> Result<String> {
        let command_line = self.command_line(args);
        tracing::trace!(command = %command_line, "Running");

        let mut command = Command::new(&self.program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);
        let child = command.output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| AppError::Timeout {
                    command: command_line.clone(),
                    after: limit,
                })?,
            None => child.await,
        }
        .map_err(|e| AppError::spawn(format!("Failed to execute `{command_line}`"), e))?;

        interpret_output(
            &command_line,
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
    }
}

/// Decide whether an invocation succeeded from its exit status and streams.
///
/// A non-zero exit always fails. Otherwise any stderr output fails unless it
/// is adb's daemon start-up banner.
pub fn interpret_output(
    command_line: &str,
    success: bool,
    stdout: &str,
    stderr: &str,
) -> Result<String> {
    if !success {
        let detail = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("no output");
        return Err(AppError::transport(format!(
            "`{command_line}` exited with an error: {detail}"
        )));
    }

    if !stderr.is_empty() && !stderr.to_lowercase().contains(BENIGN_STDERR) {
        return Err(AppError::transport(format!(
            "`{command_line}` reported: {}",
            stderr.trim()
        )));
    }

    Ok(stdout.to_string())
}

/// Normalise tool output: drop carriage returns and surrounding whitespace.
#[must_use]
pub fn clean(text: &str) -> String {
    text.replace('\r', "").trim().to_string()
}

#[cfg(test)]
pub mod scripted {
    //! Test double that replays canned responses in order.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::CommandRunner;
    use crate::domain::{AppError, Result};

    #[derive(Default)]
    pub struct ScriptedRunner {
        responses: Mutex<VecDeque<std::result::Result<String, String>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        pub fn with_responses(responses: Vec<std::result::Result<&str, &str>>) -> Self {
            let responses = responses
                .into_iter()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, args: &[&str]) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(args.iter().map(|a| (*a).to_string()).collect());
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(out)) => Ok(out),
                Some(Err(message)) => Err(AppError::transport(message)),
                None => Ok(String::new()),
            }
        }
    }
}
