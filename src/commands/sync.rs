use super::app::App;
use crate::libs::messages::Message;
use crate::msg_info;
use anyhow::Result;

/// Replays clock-outs that were saved to the offline queue.
pub async fn cmd(app: &App) -> Result<()> {
    let report = app.sessions.flush_offline_queue().await?;
    if report.replayed == 0 && report.failed.is_empty() {
        msg_info!(Message::NoPendingWrites);
    }
    Ok(())
}
