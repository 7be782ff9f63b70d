//! 按运行划分的文件日志
//!
//! [`LoggerHelper`] 在调用方文件所在目录下确定本次运行的日志文件
//! `<目录名>_<YYYYMMDDHHMMSS>.log`，[`LoggerHelper::get_logger`] 返回写入该文件的具名 [`Logger`]。
//!
//! ```no_run
//! use logging_notifications::LoggerHelper;
//!
//! # fn main() -> logging_notifications::Result<()> {
//! let helper = LoggerHelper::new(file!())?;
//! let logger = helper.get_logger("trading.engine")?;
//! logger.info("order filled");
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{Dispatch, Level};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;

use super::logger::{RecordFormatter, QUIET_TARGETS};
use crate::errors::{Error, Result};

/// 日志文件名中的时间戳格式
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// 文件日志选项
#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    /// 最低输出级别
    pub level: LevelFilter,
    /// 是否同时输出到 stderr
    pub console: bool,
    /// 控制台输出是否带颜色
    pub ansi: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            console: false,
            ansi: true,
        }
    }
}

#[derive(Default)]
struct HelperState {
    file: Option<Arc<File>>,
    loggers: HashMap<String, Logger>,
}

/// 单次运行的日志目标
pub struct LoggerHelper {
    log_path: PathBuf,
    options: LogOptions,
    state: Mutex<HelperState>,
}

impl LoggerHelper {
    /// 以调用方文件（通常是 `file!()`）所在目录作为日志目录
    pub fn new(file: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(file, LogOptions::default())
    }

    pub fn with_options(file: impl AsRef<Path>, options: LogOptions) -> Result<Self> {
        let file = file.as_ref();
        let absolute = std::path::absolute(file)?;
        let log_dir = absolute.parent().ok_or_else(|| {
            Error::Logger(format!("cannot determine directory of {}", file.display()))
        })?;
        let dir_name = log_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());

        let timestamp = chrono::Local::now().format(FILE_TIMESTAMP_FORMAT);
        let log_path = log_dir.join(format!("{}_{}.log", dir_name, timestamp));

        Ok(Self {
            log_path,
            options,
            state: Mutex::new(HelperState::default()),
        })
    }

    /// 本次运行的日志文件路径
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn options(&self) -> LogOptions {
        self.options
    }

    /// 获取具名 logger
    ///
    /// 第一次调用时以追加模式打开日志文件，打开失败直接返回错误。
    /// 同名 logger 只创建一次，后续调用返回同一个句柄，不会重复输出。
    pub fn get_logger(&self, name: &str) -> Result<Logger> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Logger("logger registry poisoned".to_string()))?;

        if let Some(logger) = state.loggers.get(name) {
            return Ok(logger.clone());
        }

        let file = match &state.file {
            Some(file) => Arc::clone(file),
            None => {
                let file = Arc::new(
                    OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&self.log_path)?,
                );
                state.file = Some(Arc::clone(&file));
                file
            }
        };

        let logger = Logger::build(name, file, self.options);
        state.loggers.insert(name.to_string(), logger.clone());
        Ok(logger)
    }
}

impl fmt::Debug for LoggerHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerHelper")
            .field("log_path", &self.log_path)
            .field("options", &self.options)
            .finish()
    }
}

/// 具名 logger 句柄，克隆开销很小
#[derive(Clone, Debug)]
pub struct Logger {
    name: Arc<str>,
    level: LevelFilter,
    dispatch: Dispatch,
}

impl Logger {
    fn build(name: &str, file: Arc<File>, options: LogOptions) -> Self {
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .event_format(RecordFormatter::new(false));

        let console_layer = options.console.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(options.ansi)
                .event_format(RecordFormatter::new(options.ansi))
        });

        let filter = QUIET_TARGETS.iter().fold(
            Targets::new().with_default(options.level),
            |filter, target| filter.with_target(*target, options.level.min(LevelFilter::ERROR)),
        );

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer);

        Self {
            name: Arc::from(name),
            level: options.level,
            dispatch: Dispatch::new(subscriber),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 最低输出级别
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.level >= level
    }

    pub fn log(&self, level: Level, message: impl fmt::Display) {
        let name: &str = &self.name;
        tracing::dispatcher::with_default(&self.dispatch, || match level {
            Level::ERROR => tracing::error!(logger = name, "{}", message),
            Level::WARN => tracing::warn!(logger = name, "{}", message),
            Level::INFO => tracing::info!(logger = name, "{}", message),
            Level::DEBUG => tracing::debug!(logger = name, "{}", message),
            Level::TRACE => tracing::trace!(logger = name, "{}", message),
        });
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::ERROR, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::WARN, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::INFO, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::DEBUG, message);
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(Level::TRACE, message);
    }

    /// 在当前线程以此 logger 作为默认订阅者执行 `f`
    ///
    /// `f` 中任何 `tracing` 事件（包括本 crate 通知客户端的事件）都会写入日志文件，
    /// 名称取事件的目标模块。
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// 安装为进程级默认订阅者，只能成功一次
    pub fn init_global(&self) -> Result<()> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())?;
        Ok(())
    }
}
