//! 测试通用工具
//!
//! 提供测试日志初始化和可编程的传输层

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use logging_notifications::{
    ChatTransport, Credentials, Error, NotifierConfig, Result, SavedSession,
};
use matrix_sdk::ruma::RoomId;
use tempfile::TempDir;

static INIT: Once = Once::new();

/// 初始化测试环境
pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// 传输层收到的调用
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Restore(String),
    Login { username: String, device_name: String },
    Sync,
    Send { room_id: String, body: String },
    Disconnect,
}

/// 记录调用并按需失败的传输层
#[derive(Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_login: bool,
    fail_sync: bool,
    fail_send: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    pub fn failing_sync(mut self) -> Self {
        self.fail_sync = true;
        self
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn connect(&mut self, _config: &NotifierConfig) -> Result<()> {
        self.record(Call::Connect);
        Ok(())
    }

    async fn restore(&mut self, session: &SavedSession) -> Result<()> {
        self.record(Call::Restore(session.device_id.clone()));
        Ok(())
    }

    async fn login(
        &mut self,
        username: &str,
        _password: &str,
        device_name: &str,
    ) -> Result<SavedSession> {
        self.record(Call::Login {
            username: username.to_string(),
            device_name: device_name.to_string(),
        });
        if self.fail_login {
            return Err(Error::Login("M_FORBIDDEN: Invalid password".to_string()));
        }
        Ok(SavedSession {
            access_token: "syt_Ym90_freshtokenvalue_0001".to_string(),
            device_id: "NEWDEVICE".to_string(),
            user_id: username.to_string(),
        })
    }

    async fn sync(&mut self) -> Result<()> {
        self.record(Call::Sync);
        if self.fail_sync {
            return Err(Error::Transport("sync timed out".to_string()));
        }
        Ok(())
    }

    async fn send_text(&mut self, room_id: &RoomId, body: &str) -> Result<()> {
        self.record(Call::Send {
            room_id: room_id.to_string(),
            body: body.to_string(),
        });
        if self.fail_send {
            return Err(Error::Transport("M_FORBIDDEN: not in room".to_string()));
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.record(Call::Disconnect);
        Ok(())
    }
}

pub const TEST_USER: &str = "@notifier:example.org";
pub const TEST_ROOM: &str = "!alerts:example.org";

/// 指向临时密钥存储目录的配置
pub fn test_config(dir: &TempDir) -> NotifierConfig {
    store_config(&dir.path().join("store"))
}

/// 指向给定密钥存储目录的配置
pub fn store_config(store_path: &Path) -> NotifierConfig {
    let credentials = Credentials::new(TEST_USER, "correct horse", TEST_ROOM).unwrap();
    NotifierConfig::new(credentials)
        .with_store_path(store_path)
        .with_device_name("test-device")
}
