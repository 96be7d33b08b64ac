//! Subprocess runner
//!
//! Runs resolved runtime commands with tokio's process support, and supervises
//! long-running background processes such as the container daemon.

use crate::command::CommandSpec;
use crate::error::CommandError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;

/// Where a subprocess writes its stdout/stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Inherit,
    Discard,
}

impl OutputMode {
    /// Inherit when `visible`, discard otherwise
    pub fn visible_if(visible: bool) -> Self {
        if visible { Self::Inherit } else { Self::Discard }
    }

    fn stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Discard => Stdio::null(),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion. A non-zero exit is an error.
    async fn run(&self, spec: &CommandSpec, output: OutputMode) -> Result<(), CommandError>;

    /// Start a command in the background and return its supervised handle
    fn spawn(
        &self,
        spec: &CommandSpec,
        output: OutputMode,
    ) -> Result<BackgroundProcess, CommandError>;
}

/// How a background process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    Exited { code: Option<i32> },
    WaitFailed(String),
    /// The supervisor went away without reporting
    Lost,
}

/// Handle to a supervised background process
///
/// The process is neither joined nor killed through this handle. The
/// supervisor reports the exit once, and `try_exit` caches it.
#[derive(Debug)]
pub struct BackgroundProcess {
    program: String,
    exit: oneshot::Receiver<ProcessExit>,
    observed: Option<ProcessExit>,
}

impl BackgroundProcess {
    /// Create a handle and the sender its supervisor reports through
    pub fn new(program: impl Into<String>) -> (oneshot::Sender<ProcessExit>, Self) {
        let (tx, rx) = oneshot::channel();
        let process = Self {
            program: program.into(),
            exit: rx,
            observed: None,
        };
        (tx, process)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Non-blocking check for an exit
    pub fn try_exit(&mut self) -> Option<&ProcessExit> {
        if self.observed.is_none() {
            match self.exit.try_recv() {
                Ok(exit) => self.observed = Some(exit),
                Err(oneshot::error::TryRecvError::Empty) => return None,
                Err(oneshot::error::TryRecvError::Closed) => self.observed = Some(ProcessExit::Lost),
            }
        }
        self.observed.as_ref()
    }

    pub fn is_running(&mut self) -> bool {
        self.try_exit().is_none()
    }
}

/// Runner backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(spec: &CommandSpec, output: OutputMode) -> Command {
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.args());
        cmd.stdin(Stdio::null());
        cmd.stdout(output.stdio());
        cmd.stderr(output.stdio());
        cmd
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec, output: OutputMode) -> Result<(), CommandError> {
        tracing::debug!("Running: {}", spec);

        let status = Self::command(spec, output)
            .status()
            .await
            .map_err(|source| CommandError::Spawn {
                program: spec.program_name(),
                source,
            })?;

        if !status.success() {
            return Err(CommandError::Failed {
                program: spec.program_name(),
                code: status.code(),
            });
        }

        Ok(())
    }

    fn spawn(
        &self,
        spec: &CommandSpec,
        output: OutputMode,
    ) -> Result<BackgroundProcess, CommandError> {
        tracing::debug!("Spawning: {}", spec);

        let mut child = Self::command(spec, output)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: spec.program_name(),
                source,
            })?;

        let (tx, process) = BackgroundProcess::new(spec.program_name());
        let program = spec.program_name();

        tokio::spawn(async move {
            let exit = match child.wait().await {
                Ok(status) => ProcessExit::Exited {
                    code: status.code(),
                },
                Err(e) => ProcessExit::WaitFailed(e.to_string()),
            };
            tracing::debug!(program = %program, exit = ?exit, "Background process finished");
            // the handle may already be gone
            let _ = tx.send(exit);
        });

        Ok(process)
    }
}
