//! Local command notifier
//!
//! Runs a program once per alert with the body on stdin, for example
//! `mail -s {subject} ops@example.com`. `{subject}` in any argument is
//! replaced with the alert subject.

use std::process::Stdio;

use albumcam_core::{
    config::CommandConfig,
    ports::{INotifier, NotifyError},
};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, info};

use crate::DELIVERY_TIMEOUT;

/// Notifier that pipes the alert into a local program
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &CommandConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn render_args(&self, subject: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{subject}", subject))
            .collect()
    }

    async fn deliver(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mut child = Command::new(&self.program)
            .args(self.render_args(subject))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NotifyError::Transport(format!("{}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A program that ignores stdin may exit before reading it; its
            // exit status decides the outcome.
            match stdin.write_all(body.as_bytes()).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(NotifyError::Transport(e.to_string())),
            }
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !output.status.success() {
            return Err(NotifyError::Rejected {
                target: self.program.clone(),
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl INotifier for CommandNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        debug!(program = %self.program, "Running alert command");
        tokio::time::timeout(DELIVERY_TIMEOUT, self.deliver(subject, body))
            .await
            .map_err(|_| {
                NotifyError::Transport(format!(
                    "{} did not finish within {}s",
                    self.program,
                    DELIVERY_TIMEOUT.as_secs()
                ))
            })??;

        info!(program = %self.program, "Alert delivered by command");
        Ok(())
    }
}
