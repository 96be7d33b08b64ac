//! 環境変数のスナップショット
//!
//! 設定のパースは `std::env` を直接読まず、このスナップショットを経由する。
//! env file の値は未設定のキーだけを埋める（プロセスの環境変数が優先）。

use crate::error::{ConfigError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// プラグイン設定キーのプレフィックス
pub const ENV_PREFIX: &str = "PLUGIN";

/// env file のパスを指定する環境変数
pub const ENV_FILE_KEY: &str = "PLUGIN_ENV_FILE";

#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在のプロセスの環境変数を取り込む
    ///
    /// UTF-8 でないキー・値は無視する
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// `PLUGIN_<NAME>` を優先し、なければ `<NAME>` を参照する
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let prefixed = format!("{}_{}", ENV_PREFIX, name);
        match self.get(&prefixed) {
            Some(value) => {
                debug!(key = %prefixed, "Resolved setting");
                Some(value)
            }
            None => self.get(name),
        }
    }

    /// キーが未設定の場合のみ値を設定する。設定した場合は true
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        use std::collections::hash_map::Entry;
        match self.vars.entry(key.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(value.into());
                true
            }
        }
    }

    /// env file を読み込み、未設定のキーを埋める
    ///
    /// 追加したキーの数を返す。ファイルが読めない場合は `ConfigError::EnvFile`
    #[tracing::instrument(skip(self))]
    pub fn load_env_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;

        let mut count = 0;
        for (key, value) in parse_env_file(&content) {
            if self.set_default(key.as_str(), value) {
                debug!(key = %key, "Adding variable from env file");
                count += 1;
            } else {
                debug!(key = %key, "Keeping existing variable over env file");
            }
        }

        info!(
            env_file = %path.display(),
            variable_count = count,
            "Loaded variables from env file"
        );

        Ok(count)
    }
}

/// dotenv 形式の内容を `(KEY, VALUE)` の列にパースする
///
/// 空行・`#` コメント・`=` を含まない行はスキップ。`export ` プレフィックスと
/// 値を囲むクォートは除去する。
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let value = strip_quotes(value.trim());
            pairs.push((key.to_string(), value.to_string()));
        }
    }

    pairs
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lookup_prefers_prefixed_key() {
        let env = Environment::from_pairs([("PLUGIN_REPO", "org/app"), ("REPO", "other/app")]);
        assert_eq!(env.lookup("REPO"), Some("org/app"));
    }

    #[test]
    fn test_lookup_falls_back_to_bare_key() {
        let env = Environment::from_pairs([("DRONE_COMMIT_SHA", "abc123")]);
        assert_eq!(env.lookup("DRONE_COMMIT_SHA"), Some("abc123"));
        assert_eq!(env.lookup("REPO"), None);
    }

    #[test]
    fn test_from_process() {
        temp_env::with_vars([("PLUGIN_SHIPFLOW_TEST_KEY", Some("value"))], || {
            let env = Environment::from_process();
            assert_eq!(env.lookup("SHIPFLOW_TEST_KEY"), Some("value"));
        });
    }

    #[test]
    fn test_parse_env_file() {
        let content = r#"
# comment
PLUGIN_REPO=org/app
export PLUGIN_TAGS="latest,v1"
PLUGIN_REGISTRY='eu.gcr.io'
not a pair
=orphan
PLUGIN_ARGS=A=1
"#;
        let pairs = parse_env_file(content);
        assert_eq!(
            pairs,
            vec![
                ("PLUGIN_REPO".to_string(), "org/app".to_string()),
                ("PLUGIN_TAGS".to_string(), "latest,v1".to_string()),
                ("PLUGIN_REGISTRY".to_string(), "eu.gcr.io".to_string()),
                ("PLUGIN_ARGS".to_string(), "A=1".to_string()),
            ]
        );
    }

    #[test]
    fn test_load_env_file_does_not_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("plugin.env");
        fs::write(&path, "PLUGIN_REPO=file/app\nPLUGIN_DRY_RUN=true\n").unwrap();

        let mut env = Environment::from_pairs([("PLUGIN_REPO", "process/app")]);
        let added = env.load_env_file(&path).unwrap();

        assert_eq!(added, 1);
        assert_eq!(env.lookup("REPO"), Some("process/app"));
        assert_eq!(env.lookup("DRY_RUN"), Some("true"));
    }

    #[test]
    fn test_load_env_file_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut env = Environment::new();

        let result = env.load_env_file(&temp_dir.path().join("missing.env"));
        assert!(matches!(result, Err(ConfigError::EnvFile { .. })));
    }
}
