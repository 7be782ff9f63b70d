//! 通知客户端配置
//!
//! 凭据来自环境变量（启动时先加载 `.env`），也可以显式传入。
//! 构造完成后配置不可变，客户端不会再读取环境。

use std::fmt;
use std::path::PathBuf;

use matrix_sdk::ruma::{OwnedRoomId, RoomId};
use url::Url;

use crate::errors::{Error, Result};
use crate::infrastructure::logger::Sanitizer;

/// 用户名环境变量
pub const ENV_USERNAME: &str = "USERNAME";
/// 密码环境变量
pub const ENV_PASSWORD: &str = "PASSWORD";
/// 房间 ID 环境变量
pub const ENV_ROOM_ID: &str = "ROOM_ID";
/// homeserver 地址环境变量（可选）
pub const ENV_HOMESERVER: &str = "MATRIX_HOMESERVER";
/// 密钥存储目录环境变量（可选）
pub const ENV_STORE_PATH: &str = "MATRIX_STORE_PATH";
/// 设备名称环境变量（可选）
pub const ENV_DEVICE_NAME: &str = "MATRIX_DEVICE_NAME";

/// 默认 homeserver
pub const DEFAULT_HOMESERVER: &str = "https://matrix.org";
/// 默认密钥存储目录
pub const DEFAULT_STORE_PATH: &str = "./store";
/// 默认设备显示名称
pub const DEFAULT_DEVICE_NAME: &str = "abitrager";

/// Matrix 账号凭据
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
    room_id: OwnedRoomId,
}

impl Credentials {
    /// 显式构造凭据，任何字段为空或房间 ID 非法都会立即失败
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        room_id: impl AsRef<str>,
    ) -> Result<Self> {
        let username = required(ENV_USERNAME, Some(username.into()))?;
        let password = required(ENV_PASSWORD, Some(password.into()))?;
        let room_id = required(ENV_ROOM_ID, Some(room_id.as_ref().to_string()))?;

        Ok(Self {
            username,
            password,
            room_id: RoomId::parse(room_id)?,
        })
    }

    /// 通过查找函数读取凭据
    ///
    /// `from_env` 使用 `std::env::var`，测试可以传入任意映射。
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = required(ENV_USERNAME, lookup(ENV_USERNAME))?;
        let password = required(ENV_PASSWORD, lookup(ENV_PASSWORD))?;
        let room_id = required(ENV_ROOM_ID, lookup(ENV_ROOM_ID))?;
        Self::new(username, password, room_id)
    }

    /// 从进程环境读取凭据（会先加载 `.env`）
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &Sanitizer::secret(&self.password))
            .field("room_id", &self.room_id)
            .finish()
    }
}

/// 通知客户端配置
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub credentials: Credentials,
    pub homeserver: Url,
    pub store_path: PathBuf,
    pub device_name: String,
}

impl NotifierConfig {
    /// 使用默认 homeserver、存储目录和设备名称
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            homeserver: default_homeserver(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }

    /// 通过查找函数读取完整配置，可选项缺省时使用默认值
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::from_lookup(&lookup)?;
        let mut config = Self::new(credentials);

        if let Some(homeserver) = non_empty(lookup(ENV_HOMESERVER)) {
            config = config.with_homeserver(&homeserver)?;
        }
        if let Some(store_path) = non_empty(lookup(ENV_STORE_PATH)) {
            config = config.with_store_path(store_path);
        }
        if let Some(device_name) = non_empty(lookup(ENV_DEVICE_NAME)) {
            config = config.with_device_name(device_name);
        }

        Ok(config)
    }

    /// 从进程环境读取完整配置（会先加载 `.env`）
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_homeserver(mut self, homeserver: &str) -> Result<Self> {
        let url = Url::parse(homeserver)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "homeserver must be an http(s) URL: {}",
                homeserver
            )));
        }
        self.homeserver = url;
        Ok(self)
    }

    pub fn with_store_path(mut self, store_path: impl Into<PathBuf>) -> Self {
        self.store_path = store_path.into();
        self
    }

    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = device_name.into();
        self
    }

    /// 会话凭据文件路径（位于密钥存储目录内）
    pub fn session_file(&self) -> PathBuf {
        self.store_path.join(crate::core::session::SESSION_FILE)
    }

    /// 存储锁文件路径
    pub fn lock_file(&self) -> PathBuf {
        self.store_path.join(crate::core::session::LOCK_FILE)
    }
}

fn default_homeserver() -> Url {
    Url::parse(DEFAULT_HOMESERVER).expect("DEFAULT_HOMESERVER is a valid URL")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(name: &'static str, value: Option<String>) -> Result<String> {
    non_empty(value).ok_or(Error::MissingVar(name))
}
