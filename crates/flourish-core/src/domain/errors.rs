//! Errors - エラー型と分類
//!
//! # 分類
//! - 一時的な I/O 失敗（StoreError / TabError）: ログに残し、その tick は中断。次の tick で再試行
//! - 不正・未知のメッセージ（MessageError）: ログに残し、応答が必要ならエラーペイロードを返す
//! - 接続断（BusError）: ContextInvalidated は終端（再試行しない）、それ以外は固定遅延で再接続
//!
//! どのエラーもホストプロセスを落とさない。

use thiserror::Error;

use super::state::StateKey;

/// StateStore の操作エラー
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored value for key '{key}' is corrupt: {reason}")]
    Corrupt { key: StateKey, reason: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Active-tab query failure.
#[derive(Debug, Error)]
#[error("tab query failed: {0}")]
pub struct TabError(pub String);

/// Message bus / connection errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The hosting context is gone for good; the user must reload.
    #[error("extension context invalidated")]
    ContextInvalidated,

    /// The coordinator is not reachable right now.
    #[error("coordinator disconnected")]
    Disconnected,

    /// The coordinator dropped the request without replying.
    #[error("coordinator dropped the request without a reply")]
    NoReply,
}

impl BusError {
    /// Should an observer try to connect again?
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BusError::ContextInvalidated)
    }
}

/// Request decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("message is not an object with a string 'type'")]
    Malformed,

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("message '{0}' requires a payload")]
    MissingPayload(&'static str),

    #[error("invalid payload for '{message}': {reason}")]
    InvalidPayload { message: &'static str, reason: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum FlourishError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tab(#[from] TabError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = FlourishError> = std::result::Result<T, E>;
