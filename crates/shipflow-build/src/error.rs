use crate::plan::StepKind;
use thiserror::Error;

/// 外部コマンドの実行エラー
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} {}", describe_exit(*code))]
    Failed { program: String, code: Option<i32> },
}

impl CommandError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Failed { code, .. } => *code,
            CommandError::Spawn { .. } => None,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

/// オーケストレーションのエラー
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Error authenticating")]
    Authentication(#[source] CommandError),

    #[error("{step} step failed")]
    Step {
        step: StepKind,
        #[source]
        source: CommandError,
    },
}

impl ExecError {
    /// 失敗したステップ
    pub fn step(&self) -> StepKind {
        match self {
            ExecError::Authentication(_) => StepKind::Login,
            ExecError::Step { step, .. } => *step,
        }
    }

    pub fn command_error(&self) -> &CommandError {
        match self {
            ExecError::Authentication(source) | ExecError::Step { source, .. } => source,
        }
    }
}

pub type ExecResult<T> = std::result::Result<T, ExecError>;
