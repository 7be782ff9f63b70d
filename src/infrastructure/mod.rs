//! 基础设施层：外部系统交互
//!
//! 提供与外部系统（Matrix homeserver、日志文件）的交互能力

pub mod log_helper;
pub mod logger;
pub mod matrix;
