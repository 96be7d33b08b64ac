use async_trait::async_trait;
use shipflow_build::{
    BackgroundProcess, CommandError, CommandRunner, CommandSpec, OutputMode, ProcessExit,
};
use shipflow_config::{Environment, PluginConfig};
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// 実行されたコマンドの記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub output: OutputMode,
    pub background: bool,
}

impl Invocation {
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// コマンドを実行せずに記録するランナー
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    failing: HashSet<&'static str>,
    spawn_fails: bool,
    daemon_exit: Option<ProcessExit>,
    daemons: Mutex<Vec<oneshot::Sender<ProcessExit>>>,
}

#[allow(dead_code)]
impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定したサブコマンドを常に失敗させる
    pub fn failing(mut self, subcommand: &'static str) -> Self {
        self.failing.insert(subcommand);
        self
    }

    pub fn spawn_fails(mut self) -> Self {
        self.spawn_fails = true;
        self
    }

    pub fn daemon_exits(mut self, exit: ProcessExit) -> Self {
        self.daemon_exit = Some(exit);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// 同期実行されたコマンドのサブコマンド列
    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|call| !call.background)
            .filter_map(|call| call.subcommand().map(str::to_string))
            .collect()
    }

    pub fn count(&self, subcommand: &str) -> usize {
        self.subcommands()
            .iter()
            .filter(|name| name.as_str() == subcommand)
            .count()
    }

    fn record(&self, spec: &CommandSpec, output: OutputMode, background: bool) {
        self.calls.lock().unwrap().push(Invocation {
            program: spec.program_name(),
            args: spec.args().to_vec(),
            output,
            background,
        });
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec, output: OutputMode) -> Result<(), CommandError> {
        self.record(spec, output, false);

        let subcommand = spec.args().first().map(String::as_str).unwrap_or_default();
        if self.failing.contains(subcommand) {
            return Err(CommandError::Failed {
                program: spec.program_name(),
                code: Some(1),
            });
        }
        Ok(())
    }

    fn spawn(
        &self,
        spec: &CommandSpec,
        output: OutputMode,
    ) -> Result<BackgroundProcess, CommandError> {
        self.record(spec, output, true);

        if self.spawn_fails {
            return Err(CommandError::Spawn {
                program: spec.program_name(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }

        let (tx, process) = BackgroundProcess::new(spec.program_name());
        match &self.daemon_exit {
            Some(exit) => {
                tx.send(exit.clone()).unwrap();
            }
            None => self.daemons.lock().unwrap().push(tx),
        }
        Ok(process)
    }
}

pub fn config(pairs: &[(&str, &str)]) -> PluginConfig {
    let mut all = vec![
        ("PLUGIN_AUTH_KEY", "\"s3cr3t\""),
        ("PLUGIN_REPO", "myorg/myapp"),
    ];
    all.extend_from_slice(pairs);
    PluginConfig::from_env(&Environment::from_pairs(all)).unwrap()
}
