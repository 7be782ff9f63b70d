//! 基于 `matrix-sdk` 的传输层
//!
//! 密钥存储使用 SDK 的 SQLite store，目录由配置给出。
//! Olm/Megolm 会话、设备密钥上传和房间密钥轮换都由 SDK 处理。

use async_trait::async_trait;
use matrix_sdk::{
    config::SyncSettings,
    matrix_auth::{MatrixSession, MatrixSessionTokens},
    ruma::{events::room::message::RoomMessageEventContent, OwnedDeviceId, RoomId, UserId},
    Client, RoomState, SessionMeta,
};
use tracing::{debug, info};

use crate::config::NotifierConfig;
use crate::core::notifier::ChatTransport;
use crate::core::session::SavedSession;
use crate::errors::{Error, Result};

#[derive(Debug, Default)]
pub struct MatrixTransport {
    client: Option<Client>,
}

impl MatrixTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 底层 SDK 客户端，连接后可用
    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    fn connected(&self) -> Result<&Client> {
        self.client.as_ref().ok_or(Error::NotStarted)
    }
}

#[async_trait]
impl ChatTransport for MatrixTransport {
    async fn connect(&mut self, config: &NotifierConfig) -> Result<()> {
        debug!(
            homeserver = %config.homeserver,
            store = %config.store_path.display(),
            "building matrix client"
        );

        let client = Client::builder()
            .homeserver_url(config.homeserver.as_str())
            .sqlite_store(&config.store_path, None)
            .build()
            .await?;

        self.client = Some(client);
        Ok(())
    }

    async fn restore(&mut self, session: &SavedSession) -> Result<()> {
        let client = self.connected()?;

        let session = MatrixSession {
            meta: SessionMeta {
                user_id: UserId::parse(&session.user_id)?,
                device_id: OwnedDeviceId::from(session.device_id.as_str()),
            },
            tokens: MatrixSessionTokens {
                access_token: session.access_token.clone(),
                refresh_token: None,
            },
        };

        client.restore_session(session).await?;
        Ok(())
    }

    async fn login(
        &mut self,
        username: &str,
        password: &str,
        device_name: &str,
    ) -> Result<SavedSession> {
        let client = self.connected()?;

        let response = client
            .matrix_auth()
            .login_username(username, password)
            .initial_device_display_name(device_name)
            .send()
            .await
            .map_err(|e| Error::Login(e.to_string()))?;

        Ok(SavedSession {
            access_token: response.access_token,
            device_id: response.device_id.to_string(),
            user_id: response.user_id.to_string(),
        })
    }

    async fn sync(&mut self) -> Result<()> {
        let client = self.connected()?;
        client
            .sync_once(SyncSettings::default().full_state(true))
            .await?;
        Ok(())
    }

    async fn send_text(&mut self, room_id: &RoomId, body: &str) -> Result<()> {
        let client = self.connected()?;

        let room = match client.get_room(room_id) {
            Some(room) if room.state() == RoomState::Joined => room,
            _ => {
                info!(room_id = %room_id, "not joined yet, joining room");
                client.join_room_by_id(room_id).await?
            }
        };

        room.send(RoomMessageEventContent::text_plain(body)).await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        // SDK 在客户端析构时落盘 store
        if self.client.take().is_some() {
            debug!("matrix client released");
        }
        Ok(())
    }
}
