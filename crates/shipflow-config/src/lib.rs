//! shipflow の設定
//!
//! 環境変数（と任意の env file）からプラグイン設定を読み取り、
//! 認証キーのデコードとリポジトリ名の修飾を行う。

pub mod env;
pub mod error;
pub mod plugin;

pub use env::{ENV_FILE_KEY, ENV_PREFIX, Environment, parse_env_file};
pub use error::*;
pub use plugin::{PluginConfig, RawSettings, decode_auth_key, qualify_repository};
