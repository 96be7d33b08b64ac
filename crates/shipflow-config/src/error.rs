use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required key {key} is not set")]
    Missing { key: String },

    #[error("invalid boolean value for {key}: {value:?}")]
    InvalidBool { key: String, value: String },

    #[error("auth key is empty after decoding")]
    EmptyAuthKey,

    #[error("failed to decode auth key")]
    Decode(#[from] serde_yaml::Error),

    #[error("failed to read env file {}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// 設定値の構文エラーかどうか（デコードエラー・env file エラー以外）
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ConfigError::Missing { .. } | ConfigError::InvalidBool { .. } | ConfigError::EmptyAuthKey
        )
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
