//! ビルドステップの実行
//!
//! デーモン起動 → 準備完了待機 → ログイン → version / info / build →
//! タグごとの tag / push。最初に失敗したコマンドで中断し、ロールバックはしない。

use crate::command::{CommandSpec, RuntimeCommand, RuntimePaths};
use crate::error::{ExecError, ExecResult};
use crate::plan::{ExecutionPlan, StepKind};
use crate::progress::StepReporter;
use crate::readiness::{Readiness, ReadinessPolicy, wait_for_daemon};
use crate::runner::{CommandRunner, OutputMode};
use shipflow_config::PluginConfig;

/// 実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecReport {
    /// デーモンを起動できたか
    pub daemon_started: bool,
    pub readiness: Readiness,
    /// 成功したステップ（ログインを含む、実行順）
    pub steps: Vec<StepKind>,
}

pub struct Plugin<R> {
    config: PluginConfig,
    paths: RuntimePaths,
    readiness: ReadinessPolicy,
    runner: R,
}

impl<R: CommandRunner> Plugin<R> {
    pub fn new(config: PluginConfig, runner: R) -> Self {
        Self {
            config,
            paths: RuntimePaths::default(),
            readiness: ReadinessPolicy::default(),
            runner,
        }
    }

    pub fn with_paths(mut self, paths: RuntimePaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_readiness(mut self, policy: ReadinessPolicy) -> Self {
        self.readiness = policy;
        self
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// ビルドステップを実行
    pub async fn exec(&self) -> ExecResult<ExecReport> {
        let debug_output = OutputMode::visible_if(self.config.debug);
        let mut reporter = StepReporter::new();

        // デーモンはバックグラウンドで起動し、終了を待たない
        let daemon_spec = self.resolve(&RuntimeCommand::daemon(&self.config));
        daemon_spec.trace();
        let mut daemon = match self.runner.spawn(&daemon_spec, debug_output) {
            Ok(process) => Some(process),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start container daemon, assuming one is already running");
                None
            }
        };
        let daemon_started = daemon.is_some();

        let probe = self.resolve(&RuntimeCommand::Info);
        let readiness = wait_for_daemon(
            &self.runner,
            &probe,
            debug_output,
            &self.readiness,
            daemon.as_mut(),
        )
        .await;

        tracing::info!(registry = %self.config.registry, "Authenticating");
        let login = self.resolve(&RuntimeCommand::login(&self.config));
        reporter.start(StepKind::Login);
        login.trace();
        if let Err(e) = self.runner.run(&login, debug_output).await {
            reporter.failed(&e);
            reporter.print_summary();
            return Err(ExecError::Authentication(e));
        }
        reporter.success();

        let plan = ExecutionPlan::from_config(&self.config);
        tracing::info!(
            image = %self.config.name,
            repo = %self.config.repo,
            steps = plan.len(),
            dry_run = self.config.dry_run,
            "Running build plan"
        );

        for command in plan.iter() {
            let step = command.kind();
            let spec = self.resolve(command);

            reporter.start(step);
            spec.trace();
            if let Err(source) = self.runner.run(&spec, OutputMode::Inherit).await {
                reporter.failed(&source);
                reporter.print_summary();
                return Err(ExecError::Step { step, source });
            }
            reporter.success();
        }

        reporter.print_summary();

        Ok(ExecReport {
            daemon_started,
            readiness,
            steps: reporter.completed(),
        })
    }

    fn resolve(&self, command: &RuntimeCommand) -> CommandSpec {
        command.resolve(&self.paths)
    }
}
