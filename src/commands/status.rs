use super::app::App;
use crate::libs::formatter::format_minutes;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::{msg_info, msg_print};
use anyhow::Result;

/// Shows the open session, active tasks and the week so far.
pub async fn cmd(app: &App) -> Result<()> {
    let tz = app.tz()?;
    let snapshot = app.sessions.snapshot();

    if snapshot.session.is_some() {
        msg_print!(Message::SessionStatusHeader, true);
        View::session(&snapshot, tz);
    } else {
        msg_info!(Message::NoOpenSession);
    }

    let tasks = app.tasks.list().await?;
    if !tasks.is_empty() {
        msg_print!(Message::ActiveTasksHeader, true);
        View::active_tasks(&tasks, app.clock.now());
    }

    let stats = app.stats.snapshot();
    msg_print!(Message::StatsHeader(stats.week_bucket.clone()), true);
    msg_print!(Message::WeekTotal {
        total: format_minutes(stats.displayed_week_minutes()),
        target: format_minutes(stats.target_minutes),
    });
    Ok(())
}
