//! 日志模块 - 记录格式、进程级初始化和敏感信息脱敏
//!
//! 特性：
//! - 统一的记录格式：`时间戳 - 名称 - 级别 - 消息`
//! - 支持人类可读、紧凑和 JSON 三种控制台格式
//! - Matrix SDK 的加密相关日志默认只保留 error
//! - 访问令牌和密码脱敏

use std::fmt;

use tracing::{field, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::errors::{Error, Result};

/// 记录时间戳格式，例如 `2024-05-01 13:45:12,034`
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// 未设置 `RUST_LOG` 时使用的过滤规则
pub const DEFAULT_FILTER: &str = "info,matrix_sdk_crypto=error,matrix_sdk::encryption=error";

/// 只输出 ERROR 的 SDK 加密相关 target
pub const QUIET_TARGETS: &[&str] = &["matrix_sdk_crypto", "matrix_sdk::encryption"];

/// 标识记录所属 logger 的字段名
pub const LOGGER_FIELD: &str = "logger";

/// 日志格式类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// `时间戳 - 名称 - 级别 - 消息`
    Pretty,
    /// 紧凑单行格式
    Compact,
    /// JSON 结构化格式（适合日志收集系统）
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

/// 控制台日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志格式
    pub format: LogFormat,
    /// 是否启用颜色（Pretty 与 Compact 有效）
    pub enable_color: bool,
    /// 是否显示目标模块（Compact 与 JSON 有效）
    pub show_target: bool,
    /// 是否显示文件名和行号
    pub show_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            enable_color: true,
            show_target: true,
            show_file: false,
        }
    }
}

impl LogConfig {
    /// 读取 `LOG_FORMAT`，未设置或无法识别时保持默认格式
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(format) = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse::<LogFormat>().ok())
        {
            config.format = format;
        }
        config
    }
}

/// 初始化进程级控制台日志
///
/// # 环境变量
/// - `RUST_LOG`: 日志级别过滤（如 `info`, `debug`, `warn,matrix_sdk=trace`）
/// - `LOG_FORMAT`: 见 [`LogConfig::from_env`]
///
/// 重复初始化返回 [`Error::Logger`]。
pub fn init(config: LogConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.enable_color)
                .event_format(RecordFormatter::new(config.enable_color));
            subscriber.with(fmt_layer).try_init()
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(config.show_target)
                .with_file(config.show_file)
                .with_line_number(config.show_file)
                .with_ansi(config.enable_color);
            subscriber.with(fmt_layer).try_init()
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(config.show_target)
                .with_file(config.show_file)
                .with_line_number(config.show_file)
                .with_current_span(true)
                .with_span_list(true);
            subscriber.with(fmt_layer).try_init()
        }
    };

    result.map_err(|e| Error::Logger(e.to_string()))
}

/// 敏感信息脱敏工具
pub struct Sanitizer;

impl Sanitizer {
    /// 脱敏 Matrix 访问令牌 - 只保留前 6 位和后 4 位
    pub fn access_token(token: &str) -> String {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() <= 12 {
            return "***".to_string();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }

    /// 脱敏密码 - 完全隐藏
    pub fn secret(_secret: &str) -> String {
        "***".to_string()
    }
}

/// 记录格式器：`时间戳 - 名称 - 级别 - 消息 key=value...`
///
/// 名称取自事件的 `logger` 字段，没有时使用事件目标模块。
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    ansi: bool,
}

impl RecordFormatter {
    pub fn new(ansi: bool) -> Self {
        Self { ansi }
    }
}

impl<S, N> FormatEvent<S, N> for RecordFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = RecordFields::default();
        event.record(&mut fields);

        let name = fields
            .logger
            .as_deref()
            .unwrap_or_else(|| event.metadata().target());

        write!(
            writer,
            "{} - {} - ",
            chrono::Local::now().format(RECORD_TIME_FORMAT),
            name
        )?;

        let level = event.metadata().level();
        if self.ansi {
            match *level {
                Level::ERROR => write!(writer, "\x1b[31mERROR\x1b[0m")?, // 红色
                Level::WARN => write!(writer, "\x1b[33mWARN\x1b[0m")?,   // 黄色
                Level::INFO => write!(writer, "\x1b[32mINFO\x1b[0m")?,   // 绿色
                Level::DEBUG => write!(writer, "\x1b[34mDEBUG\x1b[0m")?, // 蓝色
                Level::TRACE => write!(writer, "\x1b[35mTRACE\x1b[0m")?, // 紫色
            }
        } else {
            write!(writer, "{}", level)?;
        }

        writeln!(writer, " - {}{}", fields.message, fields.extra)
    }
}

/// 从事件中拆出 logger 名称、消息和其余字段
#[derive(Default)]
struct RecordFields {
    logger: Option<String>,
    message: String,
    extra: String,
}

impl RecordFields {
    fn push(&mut self, field: &field::Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            LOGGER_FIELD => self.logger = Some(value),
            name => {
                use std::fmt::Write as _;
                let _ = write!(self.extra, " {}={}", name, value);
            }
        }
    }
}

impl field::Visit for RecordFields {
    fn record_debug(&mut self, field: &field::Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &field::Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_f64(&mut self, field: &field::Field, value: f64) {
        self.push(field, format!("{:.2}", value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("invalid".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.enable_color);
        assert!(config.show_target);
        assert!(!config.show_file);
    }

    #[test]
    fn test_sanitizer_access_token() {
        let token = "syt_YWxpY2U_example_long_token_1234567890abcdef";
        let sanitized = Sanitizer::access_token(token);
        assert_eq!(sanitized, "syt_YW...cdef");

        assert_eq!(Sanitizer::access_token("short"), "***");
        assert_eq!(Sanitizer::access_token(""), "***");
    }

    #[test]
    fn test_sanitizer_secret() {
        assert_eq!(Sanitizer::secret("hunter2"), "***");
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        for target in QUIET_TARGETS {
            assert!(DEFAULT_FILTER.contains(&format!("{}=error", target)));
        }
    }
}
