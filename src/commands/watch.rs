//! Live timer in the terminal.
//!
//! Redraws one line per tick until Ctrl+C. Stopping the watch does not
//! touch the session.

use super::app::App;
use crate::libs::formatter::format_clock;
use crate::libs::messages::Message;
use crate::{msg_info, msg_print};
use anyhow::Result;
use std::io::Write;

pub async fn cmd(app: &App) -> Result<()> {
    if app.sessions.current_session().is_none() {
        msg_info!(Message::NoOpenSession);
        return Ok(());
    }

    let subscription = app.sessions.subscribe(|snapshot| {
        let line = Message::LiveElapsed {
            work: format_clock(snapshot.work_ms),
            breaks: format_clock(snapshot.break_ms),
        };
        print!("\r{}   ", line);
        let _ = std::io::stdout().flush();
    });

    tokio::signal::ctrl_c().await?;
    subscription.unsubscribe();
    app.sessions.shutdown();
    println!();
    msg_print!(Message::WatchStopped);
    Ok(())
}
