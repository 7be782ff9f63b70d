//! 日志辅助与加密通知
//!
//! 两个互相独立的组件：
//! - [`LoggerHelper`]：按运行生成带时间戳的日志文件，提供具名 logger
//! - [`NotificationClient`]：通过 Matrix 向房间发送端到端加密消息
//!
//! # 架构分层
//!
//! - `core`: 通知客户端状态机、传输层 trait 和会话持久化
//! - `infrastructure`: 日志后端与 `matrix-sdk` 传输层
//! - `config`: 凭据与客户端配置
//! - `errors`: 统一错误类型
//!
//! # 示例
//!
//! ```no_run
//! use logging_notifications::{LoggerHelper, NotificationClient};
//!
//! # async fn run() -> logging_notifications::Result<()> {
//! let helper = LoggerHelper::new(file!())?;
//! let logger = helper.get_logger("alerts")?;
//!
//! let mut client = NotificationClient::from_env()?;
//! client.start().await?;
//! client.send_message("position opened").await?;
//! client.close().await?;
//!
//! logger.info("notification sent");
//! # Ok(())
//! # }
//! ```

// 核心层
pub mod core;

// 基础设施层
pub mod infrastructure;

pub mod config;
pub mod errors;

pub use config::{Credentials, NotifierConfig};
pub use crate::core::notifier::{ChatTransport, NotificationClient};
pub use crate::core::session::{SavedSession, StoreLock};
pub use errors::{Error, Result};
pub use infrastructure::log_helper::{LogOptions, Logger, LoggerHelper};
pub use infrastructure::logger::{self as logger, LogConfig, LogFormat, Sanitizer};
pub use infrastructure::matrix::MatrixTransport;

/// 版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
