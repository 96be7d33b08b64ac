//! プラグイン設定
//!
//! 環境変数から `RawSettings` を読み取り、正規化して `PluginConfig` を作る。
//! `PluginConfig` は構築後に変更されない。

use crate::env::Environment;
use crate::error::{ConfigError, Result};
use std::fmt;

pub const DEFAULT_REGISTRY: &str = "gcr.io";
pub const DEFAULT_NAME: &str = "00000000";
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";
pub const DEFAULT_CONTEXT: &str = ".";
pub const DEFAULT_TAG: &str = "latest";

/// 正規化前の設定値
///
/// `auth_key` はエスケープされたまま、`repo` はレジストリ未付与の可能性がある。
#[derive(Clone, PartialEq, Eq)]
pub struct RawSettings {
    pub dry_run: bool,
    pub debug: bool,
    pub registry: String,
    pub auth_key: String,
    pub storage_driver: Option<String>,
    pub name: String,
    pub repo: String,
    pub dockerfile: String,
    pub context: String,
    pub tags: Vec<String>,
    pub build_args: Vec<String>,
}

impl RawSettings {
    pub fn parse(env: &Environment) -> Result<Self> {
        Ok(Self {
            dry_run: parse_bool(env, "DRY_RUN")?,
            debug: parse_bool(env, "DEBUG")?,
            registry: string_or(env, "REGISTRY", DEFAULT_REGISTRY),
            auth_key: required(env, "AUTH_KEY")?,
            storage_driver: env
                .lookup("STORAGE_DRIVER")
                .filter(|driver| !driver.is_empty())
                .map(str::to_string),
            name: string_or(env, "DRONE_COMMIT_SHA", DEFAULT_NAME),
            repo: required(env, "REPO")?,
            dockerfile: string_or(env, "DOCKERFILE", DEFAULT_DOCKERFILE),
            context: string_or(env, "CONTEXT", DEFAULT_CONTEXT),
            tags: env
                .lookup("TAGS")
                .map(split_list)
                .unwrap_or_else(|| vec![DEFAULT_TAG.to_string()]),
            build_args: env.lookup("ARGS").map(split_list).unwrap_or_default(),
        })
    }

    /// 認証キーをデコードし、リポジトリ名をレジストリで修飾する
    pub fn normalize(self) -> Result<PluginConfig> {
        let auth_key = decode_auth_key(&self.auth_key)?;
        if auth_key.is_empty() {
            return Err(ConfigError::EmptyAuthKey);
        }

        let repo = qualify_repository(&self.registry, &self.repo);
        if repo != self.repo {
            tracing::debug!(from = %self.repo, to = %repo, "Qualified repository with registry");
        }

        Ok(PluginConfig {
            dry_run: self.dry_run,
            debug: self.debug,
            registry: self.registry,
            auth_key,
            storage_driver: self.storage_driver,
            name: self.name,
            repo,
            dockerfile: self.dockerfile,
            context: self.context,
            tags: self.tags,
            build_args: self.build_args,
        })
    }
}

impl fmt::Debug for RawSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSettings")
            .field("dry_run", &self.dry_run)
            .field("debug", &self.debug)
            .field("registry", &self.registry)
            .field("auth_key", &"<redacted>")
            .field("storage_driver", &self.storage_driver)
            .field("name", &self.name)
            .field("repo", &self.repo)
            .field("dockerfile", &self.dockerfile)
            .field("context", &self.context)
            .field("tags", &self.tags)
            .field("build_args", &self.build_args)
            .finish()
    }
}

/// 正規化済みのプラグイン設定
#[derive(Clone, PartialEq, Eq)]
pub struct PluginConfig {
    /// push をスキップする
    pub dry_run: bool,
    /// デーモン出力を表示し、ログを debug レベルにする
    pub debug: bool,
    /// レジストリのホスト
    pub registry: String,
    /// デコード済みの認証キー
    pub auth_key: String,
    /// デーモンのストレージドライバ
    pub storage_driver: Option<String>,
    /// ローカルのビルドタグ
    pub name: String,
    /// レジストリで修飾済みのリポジトリ
    pub repo: String,
    pub dockerfile: String,
    pub context: String,
    pub tags: Vec<String>,
    pub build_args: Vec<String>,
}

impl PluginConfig {
    /// 環境変数からパースと正規化を一度に行う
    pub fn from_env(env: &Environment) -> Result<Self> {
        RawSettings::parse(env)?.normalize()
    }

    /// `<repo>:<tag>` 形式のターゲット名
    pub fn target(&self, tag: &str) -> String {
        format!("{}:{}", self.repo, tag)
    }
}

impl fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfig")
            .field("dry_run", &self.dry_run)
            .field("debug", &self.debug)
            .field("registry", &self.registry)
            .field("auth_key", &"<redacted>")
            .field("storage_driver", &self.storage_driver)
            .field("name", &self.name)
            .field("repo", &self.repo)
            .field("dockerfile", &self.dockerfile)
            .field("context", &self.context)
            .field("tags", &self.tags)
            .field("build_args", &self.build_args)
            .finish()
    }
}

/// エスケープされた認証キーを一度だけデコードする
///
/// 値は YAML の文字列スカラーとして解釈される。クォート付きならエスケープを
/// 解決し、プレーンスカラーはそのまま返す。文字列以外（マッピング等）は
/// `ConfigError::Decode`。
pub fn decode_auth_key(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(serde_yaml::from_str::<String>(raw)?)
}

/// `namespace/name` 形式（`/` がちょうど1つ）のリポジトリにレジストリを付与する
///
/// `/` が0個または2個以上の場合はそのまま返す。
pub fn qualify_repository(registry: &str, repo: &str) -> String {
    if repo.matches('/').count() == 1 {
        format!("{}/{}", registry, repo)
    } else {
        repo.to_string()
    }
}

fn required(env: &Environment, name: &str) -> Result<String> {
    env.lookup(name)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Missing {
            key: format!("{}_{}", crate::env::ENV_PREFIX, name),
        })
}

fn string_or(env: &Environment, name: &str, default: &str) -> String {
    env.lookup(name).unwrap_or(default).to_string()
}

fn parse_bool(env: &Environment, name: &str) -> Result<bool> {
    let Some(value) = env.lookup(name) else {
        return Ok(false);
    };

    match value.trim() {
        "" | "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        other => Err(ConfigError::InvalidBool {
            key: format!("{}_{}", crate::env::ENV_PREFIX, name),
            value: other.to_string(),
        }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
