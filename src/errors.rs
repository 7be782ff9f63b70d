//! 标准化错误处理
//!
//! 定义日志辅助与通知客户端共用的错误类型

use std::path::PathBuf;

use thiserror::Error;

/// 项目主要错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 缺少必需的环境变量
    #[error("Missing required configuration value: {0}")]
    MissingVar(&'static str),

    /// 配置错误（格式非法等）
    #[error("Configuration error: {0}")]
    Config(String),

    /// 文件系统错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 会话文件序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 登录失败
    #[error("Login failed: {0}")]
    Login(String),

    /// 传输层（homeserver 通信）错误
    #[error("Transport error: {0}")]
    Transport(String),

    /// 客户端尚未启动
    #[error("Notification client is not started")]
    NotStarted,

    /// 客户端已经启动
    #[error("Notification client is already started")]
    AlreadyStarted,

    /// 客户端已关闭
    #[error("Notification client is closed")]
    Closed,

    /// 密钥存储目录被其他客户端占用
    #[error("Key store is locked by another client: {}", .0.display())]
    StoreLocked(PathBuf),

    /// 日志系统错误
    #[error("Logger error: {0}")]
    Logger(String),
}

impl From<matrix_sdk::Error> for Error {
    fn from(err: matrix_sdk::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<matrix_sdk::ClientBuildError> for Error {
    fn from(err: matrix_sdk::ClientBuildError) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<matrix_sdk::ruma::IdParseError> for Error {
    fn from(err: matrix_sdk::ruma::IdParseError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<tracing::dispatcher::SetGlobalDefaultError> for Error {
    fn from(err: tracing::dispatcher::SetGlobalDefaultError) -> Self {
        Error::Logger(err.to_string())
    }
}

/// 项目结果类型别名
pub type Result<T> = std::result::Result<T, Error>;
