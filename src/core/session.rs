//! 会话持久化与密钥存储锁
//!
//! - `credentials.json`：登录后保存访问令牌、设备 ID 和用户 ID，下次启动复用同一设备
//! - `.lock`：启动时对其加操作系统咨询锁，防止多个客户端同时写同一个密钥存储。
//!   锁随文件句柄释放，进程被杀死时由内核释放，文件本身保留

use std::fmt;
use std::fs::{File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{Error, Result};
use crate::infrastructure::logger::Sanitizer;

/// 会话凭据文件名
pub const SESSION_FILE: &str = "credentials.json";
/// 存储锁文件名
pub const LOCK_FILE: &str = ".lock";

/// 登录后保存的会话
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub access_token: String,
    pub device_id: String,
    pub user_id: String,
}

/// 磁盘上的原始格式，字段允许缺失
#[derive(Deserialize)]
struct SessionFile {
    access_token: Option<String>,
    device_id: Option<String>,
    user_id: Option<String>,
}

impl SavedSession {
    /// 读取会话文件
    ///
    /// 文件不存在或缺少字段时返回 `None`，调用方应重新登录。
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: SessionFile = serde_json::from_str(&content)?;
        match (file.access_token, file.device_id, file.user_id) {
            (Some(access_token), Some(device_id), Some(user_id)) if !access_token.is_empty() => {
                Ok(Some(Self {
                    access_token,
                    device_id,
                    user_id,
                }))
            }
            _ => {
                warn!(path = %path.display(), "incomplete session file, ignoring");
                Ok(None)
            }
        }
    }

    /// 写入会话文件（Unix 下权限为 0600）
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        debug!(path = %path.display(), "session saved");
        Ok(())
    }
}

impl fmt::Debug for SavedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavedSession")
            .field("access_token", &Sanitizer::access_token(&self.access_token))
            .field("device_id", &self.device_id)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// 密钥存储目录的独占锁
///
/// 持有 `.lock` 的打开句柄及其排他锁，析构或进程退出时释放。
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    /// 创建存储目录并获取锁
    ///
    /// 锁正被其他句柄（本进程或其他进程）持有时返回 [`Error::StoreLocked`]。
    pub fn acquire(store_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(store_path)?;
        let path = store_path.join(LOCK_FILE);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(Error::StoreLocked(store_path.to_path_buf()));
            }
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }

        // 仅供排查，锁本身不依赖文件内容
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        debug!(path = %path.display(), "store lock acquired");
        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
