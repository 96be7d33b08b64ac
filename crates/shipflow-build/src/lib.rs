//! shipflow のビルドオーケストレーション
//!
//! コンテナランタイム（`docker` / `dockerd`）をサブプロセスとして呼び出し、
//! デーモン起動、レジストリ認証、イメージのビルド・タグ付け・プッシュを
//! 順番に実行する。

pub mod command;
pub mod error;
pub mod exec;
pub mod plan;
pub mod progress;
pub mod readiness;
pub mod runner;

pub use command::{CommandSpec, RuntimeCommand, RuntimePaths};
pub use error::{CommandError, ExecError, ExecResult};
pub use exec::{ExecReport, Plugin};
pub use plan::{ExecutionPlan, StepKind};
pub use progress::StepReporter;
pub use readiness::{Readiness, ReadinessPolicy, wait_for_daemon};
pub use runner::{BackgroundProcess, CommandRunner, OutputMode, ProcessExit, ProcessRunner};
