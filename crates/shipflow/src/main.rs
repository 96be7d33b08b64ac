use anyhow::Context;
use clap::Parser;
use shipflow_build::command::{DOCKER_BIN, DOCKERD_BIN};
use shipflow_build::{Plugin, ProcessRunner, RuntimePaths};
use shipflow_config::{ENV_FILE_KEY, Environment, PluginConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shipflow", version)]
#[command(about = "Build a container image and push it to a registry", long_about = None)]
struct Cli {
    /// 設定を読み込む env file（既存の環境変数は上書きしない）
    #[arg(long, env = ENV_FILE_KEY)]
    env_file: Option<PathBuf>,
    /// docker クライアントのパス
    #[arg(long, env = "PLUGIN_DOCKER_BIN", default_value = DOCKER_BIN)]
    docker_bin: PathBuf,
    /// docker デーモンのパス
    #[arg(long, env = "PLUGIN_DOCKERD_BIN", default_value = DOCKERD_BIN)]
    dockerd_bin: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // env file は設定のパースより前に読み込む
    let mut env = Environment::from_process();
    let env_file = cli
        .env_file
        .filter(|path| !path.as_os_str().is_empty())
        .map(|path| {
            let loaded = env.load_env_file(&path);
            (path, loaded)
        });

    // debug フラグが分かるまでログ出力は初期化できない
    let config = PluginConfig::from_env(&env);
    init_logging(config.as_ref().is_ok_and(|config| config.debug));

    match env_file {
        Some((path, Ok(count))) => {
            tracing::debug!(env_file = %path.display(), variable_count = count, "Loaded env file");
        }
        Some((_, Err(e))) => {
            tracing::warn!("{:#}", anyhow::Error::new(e));
        }
        None => {}
    }

    let config = config.map_err(|e| {
        let message = if e.is_parse_error() {
            "failed to parse parameters"
        } else {
            "failed to prepare plugin"
        };
        anyhow::Error::new(e).context(message)
    })?;
    tracing::debug!(config = ?config, "Loaded configuration");

    let plugin = Plugin::new(config, ProcessRunner::new()).with_paths(RuntimePaths {
        docker: cli.docker_bin,
        dockerd: cli.dockerd_bin,
    });

    let report = plugin.exec().await.context("failed to execute plugin")?;
    tracing::info!(
        steps = report.steps.len(),
        daemon_ready = report.readiness.is_ready(),
        "Build step finished"
    );

    Ok(())
}

/// ログ出力を初期化（stderr）。RUST_LOG が設定されていればそれを優先する
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
