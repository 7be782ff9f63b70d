//! 发送一条加密通知
//!
//! 需要 `USERNAME`、`PASSWORD`、`ROOM_ID`（可写在 `.env` 中）。
//! 首次运行会登录并创建新设备，请在自己的 Matrix 客户端中验证该设备。
//!
//! ```text
//! cargo run --example send_notification -- "backtest finished"
//! ```

use anyhow::{Context, Result};
use logging_notifications::{logger, LogConfig, LoggerHelper, NotificationClient};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logger::init(LogConfig::from_env())?;

    let helper = LoggerHelper::new(file!())?;
    let run_log = helper.get_logger("send_notification")?;

    let message = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hello from logging-notifications".to_string());

    let mut client = NotificationClient::from_env().context("missing Matrix credentials")?;
    client.start().await.context("failed to start notification client")?;

    let sent = client.send_message(&message).await;
    client.close().await?;
    sent.context("failed to send notification")?;

    run_log.info(format!("notification delivered: {}", message));
    info!(log_file = %helper.log_path().display(), "done");
    Ok(())
}
