use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::AdminError;

/// Captured output of one admin command.
#[derive(Debug, Clone, Default)]
pub struct CmdOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Bidirectional command interface to the local database engine.
///
/// Verbs issued through this channel: `cluster/sid <db>`,
/// `cluster/status <db>`, `cluster/kick <db> <sid>`,
/// `cluster/change-election-timer <db> <ms>` and `exit`. Every call carries
/// a caller-supplied timeout; a call that exceeds it fails for this cycle
/// and is retried on the next periodic tick.
#[async_trait]
pub trait AdminChannel: Send + Sync {
    async fn execute(&self, timeout: Duration, args: &[String]) -> Result<CmdOutput, AdminError>;
}

/// [`AdminChannel`] backed by the engine's control utility, invoked as a
/// subprocess against the engine's control socket.
pub struct CtlChannel {
    program: String,
    target: String,
}

impl CtlChannel {
    pub fn new(program: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            target: target.into(),
        }
    }
}

#[async_trait]
impl AdminChannel for CtlChannel {
    async fn execute(&self, timeout: Duration, args: &[String]) -> Result<CmdOutput, AdminError> {
        debug!("running {} -t {} {:?}", self.program, self.target, args);

        let output = tokio::time::timeout(
            timeout,
            Command::new(&self.program)
                .arg("-t")
                .arg(&self.target)
                .args(args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| AdminError::Timeout {
            args: args.to_vec(),
            timeout_ms: timeout.as_millis() as u64,
        })??;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(AdminError::Failed {
                args: args.to_vec(),
                stderr,
            });
        }

        Ok(CmdOutput { stdout, stderr })
    }
}
