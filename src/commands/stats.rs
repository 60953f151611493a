use super::app::App;
use crate::db::stats_cache::StatsCache;
use crate::libs::formatter::format_minutes;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::{msg_info, msg_print, msg_success};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Rebuild the cached totals from every time log
    #[arg(short, long)]
    recompute: bool,

    /// Recompute the totals of the last N weeks
    #[arg(short, long, value_name = "WEEKS")]
    backfill: Option<usize>,

    /// Show stored weekly totals
    #[arg(long)]
    history: bool,
}

pub async fn cmd(app: &App, args: StatsArgs) -> Result<()> {
    if args.recompute {
        let stats = app.stats.recompute_all().await?;
        msg_success!(Message::StatsRecomputed(stats.week_bucket));
    }

    if let Some(weeks) = args.backfill {
        let totals = app
            .stats
            .backfill_weekly_totals(weeks, |progress| {
                msg_print!(Message::BackfillProgress {
                    done: progress.done,
                    total: progress.total,
                    week: progress.week.clone(),
                });
            })
            .await?;
        msg_success!(Message::BackfillCompleted(totals.len()));
    }

    if args.history {
        let history = StatsCache::new(app.db.clone()).weekly_history().await?;
        if history.is_empty() {
            msg_info!(Message::NoWeeklyTotals);
        } else {
            msg_print!(Message::WeeklyHistoryHeader, true);
            View::weekly_totals(&history);
        }
        return Ok(());
    }

    let stats = app.stats.snapshot();
    msg_print!(Message::StatsHeader(stats.week_bucket.clone()), true);
    msg_print!(Message::WeekTotal {
        total: format_minutes(stats.displayed_week_minutes()),
        target: format_minutes(stats.target_minutes),
    });
    if !stats.job_minutes.is_empty() {
        View::week(&stats);
    }
    Ok(())
}
