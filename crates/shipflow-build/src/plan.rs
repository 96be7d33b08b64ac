//! 実行計画
//!
//! ログイン後に順番に実行するコマンド列。最初の失敗で中断される。

use crate::command::RuntimeCommand;
use shipflow_config::PluginConfig;
use std::fmt;

/// 実行ステップの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Daemon,
    Login,
    Version,
    Info,
    Build,
    Tag,
    Push,
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Daemon => "daemon",
            Self::Login => "login",
            Self::Version => "version",
            Self::Info => "info",
            Self::Build => "build",
            Self::Tag => "tag",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    commands: Vec<RuntimeCommand>,
}

impl ExecutionPlan {
    /// version → info → build → (tag → push) × タグ数
    ///
    /// dry run の場合 push は含まれない。
    pub fn from_config(config: &PluginConfig) -> Self {
        let mut commands = vec![
            RuntimeCommand::Version,
            RuntimeCommand::Info,
            RuntimeCommand::build(config),
        ];

        for tag in &config.tags {
            commands.push(RuntimeCommand::tag(config, tag));

            if !config.dry_run {
                commands.push(RuntimeCommand::push(config, tag));
            }
        }

        Self { commands }
    }

    pub fn commands(&self) -> &[RuntimeCommand] {
        &self.commands
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuntimeCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// push 先の一覧
    pub fn push_targets(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RuntimeCommand::Push { target } => Some(target.as_str()),
                _ => None,
            })
            .collect()
    }
}
