//! コンテナランタイムのコマンド定義
//!
//! `docker` / `dockerd` の呼び出しを型付きで表現し、実行可能な
//! `CommandSpec`（プログラム + 引数）に解決する。

use crate::plan::StepKind;
use shipflow_config::PluginConfig;
use std::fmt;
use std::path::PathBuf;

pub const DOCKER_BIN: &str = "/usr/local/bin/docker";
pub const DOCKERD_BIN: &str = "/usr/local/bin/dockerd";

/// サービスアカウントキーでログインする際のユーザー名
pub const LOGIN_USERNAME: &str = "_json_key";

const SECRET_MASK: &str = "********";

/// ランタイムバイナリのパス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub docker: PathBuf,
    pub dockerd: PathBuf,
}

impl Default for RuntimePaths {
    fn default() -> Self {
        Self {
            docker: PathBuf::from(DOCKER_BIN),
            dockerd: PathBuf::from(DOCKERD_BIN),
        }
    }
}

/// ランタイムの呼び出し
#[derive(Clone, PartialEq, Eq)]
pub enum RuntimeCommand {
    Daemon {
        storage_driver: Option<String>,
    },
    Version,
    Info,
    Login {
        registry: String,
        auth_key: String,
    },
    Build {
        name: String,
        dockerfile: String,
        context: String,
        build_args: Vec<String>,
    },
    Tag {
        name: String,
        target: String,
    },
    Push {
        target: String,
    },
}

impl RuntimeCommand {
    pub fn daemon(config: &PluginConfig) -> Self {
        Self::Daemon {
            storage_driver: config.storage_driver.clone(),
        }
    }

    pub fn login(config: &PluginConfig) -> Self {
        Self::Login {
            registry: config.registry.clone(),
            auth_key: config.auth_key.clone(),
        }
    }

    pub fn build(config: &PluginConfig) -> Self {
        Self::Build {
            name: config.name.clone(),
            dockerfile: config.dockerfile.clone(),
            context: config.context.clone(),
            build_args: config.build_args.clone(),
        }
    }

    pub fn tag(config: &PluginConfig, tag: &str) -> Self {
        Self::Tag {
            name: config.name.clone(),
            target: config.target(tag),
        }
    }

    pub fn push(config: &PluginConfig, tag: &str) -> Self {
        Self::Push {
            target: config.target(tag),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Self::Daemon { .. } => StepKind::Daemon,
            Self::Version => StepKind::Version,
            Self::Info => StepKind::Info,
            Self::Login { .. } => StepKind::Login,
            Self::Build { .. } => StepKind::Build,
            Self::Tag { .. } => StepKind::Tag,
            Self::Push { .. } => StepKind::Push,
        }
    }

    /// 実行可能なコマンドに解決する
    pub fn resolve(&self, paths: &RuntimePaths) -> CommandSpec {
        match self {
            Self::Daemon { storage_driver } => {
                let mut spec = CommandSpec::new(paths.dockerd.clone());
                if let Some(driver) = storage_driver {
                    spec = spec.arg("-s").arg(driver);
                }
                spec
            }
            Self::Version => CommandSpec::new(paths.docker.clone()).arg("version"),
            Self::Info => CommandSpec::new(paths.docker.clone()).arg("info"),
            Self::Login { registry, auth_key } => CommandSpec::new(paths.docker.clone())
                .arg("login")
                .arg("-u")
                .arg(LOGIN_USERNAME)
                .arg("-p")
                .secret_arg(auth_key)
                .arg(registry),
            Self::Build {
                name,
                dockerfile,
                context,
                build_args,
            } => {
                let mut spec = CommandSpec::new(paths.docker.clone())
                    .arg("build")
                    .arg("--pull=true")
                    .arg("--rm=true")
                    .arg("-t")
                    .arg(name)
                    .arg("-f")
                    .arg(dockerfile);
                for build_arg in build_args {
                    spec = spec.arg("--build-arg").arg(build_arg);
                }
                spec.arg(context)
            }
            Self::Tag { name, target } => CommandSpec::new(paths.docker.clone())
                .arg("tag")
                .arg(name)
                .arg(target),
            Self::Push { target } => CommandSpec::new(paths.docker.clone())
                .arg("push")
                .arg(target),
        }
    }
}

impl fmt::Debug for RuntimeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login { registry, .. } => f
                .debug_struct("Login")
                .field("registry", registry)
                .field("auth_key", &SECRET_MASK)
                .finish(),
            Self::Daemon { storage_driver } => f
                .debug_struct("Daemon")
                .field("storage_driver", storage_driver)
                .finish(),
            Self::Version => f.write_str("Version"),
            Self::Info => f.write_str("Info"),
            Self::Build {
                name,
                dockerfile,
                context,
                build_args,
            } => f
                .debug_struct("Build")
                .field("name", name)
                .field("dockerfile", dockerfile)
                .field("context", context)
                .field("build_args", build_args)
                .finish(),
            Self::Tag { name, target } => f
                .debug_struct("Tag")
                .field("name", name)
                .field("target", target)
                .finish(),
            Self::Push { target } => f.debug_struct("Push").field("target", target).finish(),
        }
    }
}

/// 解決済みのコマンド（プログラム + 引数）
///
/// `Display` は `[program arg ...]` 形式で、秘密の引数はマスクされる。
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    secret: Option<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// ログ・トレースでマスクされる引数を追加
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret = Some(self.args.len());
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// 実行直前のトレース出力
    pub fn trace(&self) {
        println!("{}", self);
    }

    fn display_args(&self) -> impl Iterator<Item = &str> {
        self.args.iter().enumerate().map(|(i, arg)| {
            if self.secret == Some(i) {
                SECRET_MASK
            } else {
                arg.as_str()
            }
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.program.display())?;
        for arg in self.display_args() {
            write!(f, " {}", arg)?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.display_args().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipflow_config::Environment;

    fn config(pairs: &[(&str, &str)]) -> PluginConfig {
        let mut all = vec![("PLUGIN_AUTH_KEY", "s3cr3t"), ("PLUGIN_REPO", "myorg/myapp")];
        all.extend_from_slice(pairs);
        PluginConfig::from_env(&Environment::from_pairs(all)).unwrap()
    }

    #[test]
    fn test_daemon_without_storage_driver() {
        let spec = RuntimeCommand::daemon(&config(&[])).resolve(&RuntimePaths::default());
        assert_eq!(spec.program(), &PathBuf::from(DOCKERD_BIN));
        assert!(spec.args().is_empty());
    }

    #[test]
    fn test_daemon_with_storage_driver() {
        let spec = RuntimeCommand::daemon(&config(&[("PLUGIN_STORAGE_DRIVER", "vfs")]))
            .resolve(&RuntimePaths::default());
        assert_eq!(spec.args(), ["-s", "vfs"]);
    }

    #[test]
    fn test_login_args() {
        let spec = RuntimeCommand::login(&config(&[])).resolve(&RuntimePaths::default());
        assert_eq!(spec.args(), ["login", "-u", "_json_key", "-p", "s3cr3t", "gcr.io"]);
    }

    #[test]
    fn test_login_trace_masks_secret() {
        let spec = RuntimeCommand::login(&config(&[])).resolve(&RuntimePaths::default());
        let rendered = spec.to_string();
        assert_eq!(
            rendered,
            "[/usr/local/bin/docker login -u _json_key -p ******** gcr.io]"
        );
        assert!(!format!("{:?}", spec).contains("s3cr3t"));
        assert!(!format!("{:?}", RuntimeCommand::login(&config(&[]))).contains("s3cr3t"));
    }

    #[test]
    fn test_build_args() {
        let config = config(&[
            ("DRONE_COMMIT_SHA", "abc123"),
            ("PLUGIN_DOCKERFILE", "build/Dockerfile"),
            ("PLUGIN_CONTEXT", "app"),
            ("PLUGIN_ARGS", "A=1,B=2"),
        ]);
        let spec = RuntimeCommand::build(&config).resolve(&RuntimePaths::default());
        assert_eq!(
            spec.args(),
            [
                "build",
                "--pull=true",
                "--rm=true",
                "-t",
                "abc123",
                "-f",
                "build/Dockerfile",
                "--build-arg",
                "A=1",
                "--build-arg",
                "B=2",
                "app",
            ]
        );
    }

    #[test]
    fn test_tag_and_push_targets() {
        let config = config(&[]);
        let paths = RuntimePaths::default();

        let tag = RuntimeCommand::tag(&config, "v1").resolve(&paths);
        assert_eq!(tag.args(), ["tag", "00000000", "gcr.io/myorg/myapp:v1"]);

        let push = RuntimeCommand::push(&config, "v1").resolve(&paths);
        assert_eq!(push.to_string(), "[/usr/local/bin/docker push gcr.io/myorg/myapp:v1]");
    }

    #[test]
    fn test_custom_paths() {
        let paths = RuntimePaths {
            docker: PathBuf::from("/opt/bin/docker"),
            dockerd: PathBuf::from("/opt/bin/dockerd"),
        };
        assert_eq!(
            RuntimeCommand::Info.resolve(&paths).to_string(),
            "[/opt/bin/docker info]"
        );
    }
}
