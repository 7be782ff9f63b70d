//! 核心层：通知客户端的状态机与会话持久化
//!
//! 传输层以 trait 抽象，生产实现见 `infrastructure::matrix`

pub mod notifier;
pub mod session;
