//! 加密通知客户端
//!
//! [`NotificationClient`] 负责登录或恢复会话、同步密钥，并向配置的房间发送文本消息。
//! 加密、密钥轮换和设备验证全部由传输层（生产环境为 `matrix-sdk`）完成。
//!
//! 新设备登录后必须在自己的 Matrix 客户端中完成验证，
//! 否则接收方可能将发出的消息标记为不可信。

use async_trait::async_trait;
use matrix_sdk::ruma::RoomId;
use tracing::{error, info, warn};

use super::session::{SavedSession, StoreLock};
use crate::config::NotifierConfig;
use crate::errors::{Error, Result};
use crate::infrastructure::logger::Sanitizer;
use crate::infrastructure::matrix::MatrixTransport;

/// 与 homeserver 通信的传输层
///
/// 每个方法一次只会被调用一个，调用顺序为
/// `connect` → (`restore` | `login`) → `sync` → `send_text`* → `disconnect`。
#[async_trait]
pub trait ChatTransport: Send {
    /// 建立客户端并打开密钥存储
    async fn connect(&mut self, config: &NotifierConfig) -> Result<()>;

    /// 恢复之前保存的会话
    async fn restore(&mut self, session: &SavedSession) -> Result<()>;

    /// 使用密码登录，返回新会话
    async fn login(
        &mut self,
        username: &str,
        password: &str,
        device_name: &str,
    ) -> Result<SavedSession>;

    /// 完整状态同步，上传设备密钥并获取设备列表
    async fn sync(&mut self) -> Result<()>;

    /// 发送纯文本消息，由传输层加密
    async fn send_text(&mut self, room_id: &RoomId, body: &str) -> Result<()>;

    /// 释放连接，持久化密钥存储
    async fn disconnect(&mut self) -> Result<()>;
}

struct ActiveSession {
    session: SavedSession,
    _lock: StoreLock,
}

enum State {
    Idle,
    Started(ActiveSession),
    Closed,
}

/// 加密通知客户端
pub struct NotificationClient<T = MatrixTransport> {
    config: NotifierConfig,
    transport: T,
    state: State,
}

impl NotificationClient<MatrixTransport> {
    /// 使用 `matrix-sdk` 传输层创建客户端，不会发起任何网络请求
    pub fn new(config: NotifierConfig) -> Self {
        Self::with_transport(config, MatrixTransport::new())
    }

    /// 从环境变量（及 `.env`）读取配置，缺少必需值时立即失败
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(NotifierConfig::from_env()?))
    }
}

impl<T: ChatTransport> NotificationClient<T> {
    pub fn with_transport(config: NotifierConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: State::Idle,
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, State::Started(_))
    }

    /// 当前会话的用户 ID
    pub fn user_id(&self) -> Option<&str> {
        self.active().map(|a| a.session.user_id.as_str())
    }

    /// 当前会话的设备 ID
    pub fn device_id(&self) -> Option<&str> {
        self.active().map(|a| a.session.device_id.as_str())
    }

    fn active(&self) -> Option<&ActiveSession> {
        match &self.state {
            State::Started(active) => Some(active),
            _ => None,
        }
    }

    /// 启动客户端：获取存储锁，恢复或新建会话，然后完整同步
    ///
    /// 必须在 [`send_message`](Self::send_message) 之前调用。关闭后可以再次启动。
    pub async fn start(&mut self) -> Result<()> {
        if self.is_started() {
            return Err(Error::AlreadyStarted);
        }

        let lock = StoreLock::acquire(&self.config.store_path)?;

        let session = match self.establish_session().await {
            Ok(session) => session,
            Err(e) => {
                if let Err(disconnect_err) = self.transport.disconnect().await {
                    warn!(error = %disconnect_err, "failed to release transport after start error");
                }
                return Err(e);
            }
        };

        info!(
            user_id = %session.user_id,
            device_id = %session.device_id,
            "notification client started"
        );
        self.state = State::Started(ActiveSession {
            session,
            _lock: lock,
        });
        Ok(())
    }

    async fn establish_session(&mut self) -> Result<SavedSession> {
        self.transport.connect(&self.config).await?;

        let session = match SavedSession::load(&self.config.session_file()).await? {
            Some(session) => {
                info!(
                    user_id = %session.user_id,
                    device_id = %session.device_id,
                    access_token = %Sanitizer::access_token(&session.access_token),
                    "restoring saved session"
                );
                self.transport.restore(&session).await?;
                session
            }
            None => self.login().await?,
        };

        self.transport.sync().await?;
        Ok(session)
    }

    async fn login(&mut self) -> Result<SavedSession> {
        let credentials = &self.config.credentials;
        let session = self
            .transport
            .login(
                credentials.username(),
                credentials.password(),
                &self.config.device_name,
            )
            .await
            .inspect_err(|e| error!(username = %credentials.username(), "Login failed: {}", e))?;

        session.save(&self.config.session_file()).await?;

        info!(
            "Logged in as {} on device {}",
            session.user_id, session.device_id
        );
        info!("Please verify this device in your Matrix client to enable encrypted messaging.");
        Ok(session)
    }

    /// 向配置的房间发送消息
    ///
    /// 启动前调用返回 [`Error::NotStarted`]，关闭后调用返回 [`Error::Closed`]。
    pub async fn send_message(&mut self, message: &str) -> Result<()> {
        match self.state {
            State::Idle => return Err(Error::NotStarted),
            State::Closed => return Err(Error::Closed),
            State::Started(_) => {}
        }

        self.transport
            .send_text(self.config.credentials.room_id(), message)
            .await?;

        info!("Sent message to Matrix room: {}", message);
        Ok(())
    }

    /// 关闭会话并释放存储锁；未启动时什么也不做
    pub async fn close(&mut self) -> Result<()> {
        if !self.is_started() {
            return Ok(());
        }

        let result = self.transport.disconnect().await;
        self.state = State::Closed;
        info!("notification client closed");
        result
    }
}
