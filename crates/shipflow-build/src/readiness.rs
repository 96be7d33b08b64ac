//! デーモン準備完了の待機
//!
//! `docker info` を固定間隔でポーリングする（指数バックオフなし）。
//! 上限回数に達しても失敗にはせず、呼び出し側はそのまま次に進む。

use crate::command::CommandSpec;
use crate::runner::{BackgroundProcess, CommandRunner, OutputMode, ProcessExit};
use std::time::Duration;
use tokio::time::sleep;

pub const MAX_RETRY: u32 = 15;
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY,
            interval: RETRY_INTERVAL,
        }
    }
}

/// 待機の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// デーモンが応答するまで待機
///
/// # Arguments
/// * `probe` - 準備確認コマンド（`docker info`）
/// * `daemon` - 起動したデーモンのハンドル（早期終了の検出に使う）
pub async fn wait_for_daemon<R>(
    runner: &R,
    probe: &CommandSpec,
    output: OutputMode,
    policy: &ReadinessPolicy,
    mut daemon: Option<&mut BackgroundProcess>,
) -> Readiness
where
    R: CommandRunner + ?Sized,
{
    let mut reported_exit = false;

    for attempt in 1..=policy.max_attempts {
        probe.trace();
        match runner.run(probe, output).await {
            Ok(()) => {
                tracing::info!(attempts = attempt, "Container daemon is ready");
                return Readiness::Ready { attempts: attempt };
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "Container daemon not ready yet");
            }
        }

        // デーモンが先に終了していないか確認（1回だけ報告）
        if !reported_exit
            && let Some(process) = daemon.as_deref_mut()
            && let Some(exit) = process.try_exit().cloned()
        {
            report_daemon_exit(process.program(), &exit);
            reported_exit = true;
        }

        if attempt < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }

    tracing::warn!(
        attempts = policy.max_attempts,
        "Container daemon did not become ready, continuing anyway"
    );
    Readiness::Exhausted {
        attempts: policy.max_attempts,
    }
}

fn report_daemon_exit(program: &str, exit: &ProcessExit) {
    match exit {
        ProcessExit::Exited { code } => {
            tracing::warn!(program = %program, code = ?code, "Container daemon exited early");
        }
        ProcessExit::WaitFailed(message) => {
            tracing::warn!(program = %program, error = %message, "Failed to wait on container daemon");
        }
        ProcessExit::Lost => {
            tracing::warn!(program = %program, "Lost track of container daemon");
        }
    }
}
