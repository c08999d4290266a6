// src/exec/command.rs

//! Shell-command step action.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::action::{ActionError, ActionFuture, StepAction};

/// Runs a shell command; the step succeeds iff the process exits with status 0.
///
/// Stdout and stderr are consumed line by line and logged at debug level so
/// the child never blocks on a full pipe.
#[derive(Debug, Clone)]
pub struct CommandAction {
    name: String,
    cmd: String,
}

impl CommandAction {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
        }
    }
}

impl StepAction for CommandAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> ActionFuture {
        let name = self.name.clone();
        let cmd = self.cmd.clone();
        Box::pin(async move { run_command(&name, &cmd).await })
    }
}

async fn run_command(step: &str, cmd: &str) -> Result<(), ActionError> {
    info!(step = %step, cmd = %cmd, "starting step process");

    // Build a shell command appropriate for the platform.
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(ActionError::Spawn)?;

    if let Some(stdout) = child.stdout.take() {
        spawn_line_logger(step.to_string(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_logger(step.to_string(), "stderr", stderr);
    }

    let status = child.wait().await.map_err(ActionError::Spawn)?;
    let code = status.code().unwrap_or(-1);

    info!(
        step = %step,
        exit_code = code,
        success = status.success(),
        "step process exited"
    );

    if status.success() {
        Ok(())
    } else {
        Err(ActionError::ExitStatus { code })
    }
}

fn spawn_line_logger<R>(step: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(step = %step, stream, "{}", line);
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_is_ok() {
        let action = CommandAction::new("ok", "echo hello");
        assert_eq!(action.name(), "ok");
        assert!(action.execute().await.is_ok());
    }

    #[tokio::test]
    async fn failing_command_reports_exit_status() {
        let action = CommandAction::new("bad", "exit 3");
        match action.execute().await {
            Err(ActionError::ExitStatus { code }) => assert_eq!(code, 3),
            other => panic!("expected ExitStatus error, got {other:?}"),
        }
    }
}
