//! Time log maintenance.

use super::app::{parse_local, resolve_prefix, App};
use crate::libs::messages::Message;
use crate::libs::time_log::{NewTimeLog, TimeLog, TimeLogFilter, TimeLogSource};
use crate::libs::view::View;
use crate::{msg_info, msg_print, msg_success};
use anyhow::Result;
use clap::{Args, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm};

#[derive(Debug, Args)]
pub struct LogArgs {
    #[command(subcommand)]
    command: Option<LogCommand>,
}

#[derive(Debug, Subcommand)]
enum LogCommand {
    /// List logs of a week (the current one by default)
    List {
        /// Week key, e.g. 2025-01-06
        #[arg(short, long)]
        week: Option<String>,
        #[arg(short, long)]
        job: Option<String>,
    },
    /// Record time that was not tracked live
    Add {
        /// Start, `YYYY-MM-DD HH:MM` in the configured time zone
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(short, long)]
        job: Option<String>,
        /// Minutes to book; defaults to the whole span
        #[arg(short, long)]
        minutes: Option<i64>,
        #[arg(long)]
        non_billable: bool,
        #[arg(short, long)]
        note: Option<String>,
    },
    Rm {
        id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Link a log to an invoice; a log is invoiced at most once
    Invoice {
        id: String,
        invoice: String,
    },
}

pub async fn cmd(app: &App, args: LogArgs) -> Result<()> {
    match args.command {
        Some(LogCommand::List { week, job }) => handle_list(app, week, job).await,
        None => handle_list(app, None, None).await,
        Some(LogCommand::Add {
            start,
            end,
            job,
            minutes,
            non_billable,
            note,
        }) => {
            let tz = app.tz()?;
            let start = parse_local(&start, tz)?;
            let end = parse_local(&end, tz)?;
            let minutes = minutes.unwrap_or_else(|| (end - start).num_minutes());
            let log = app
                .time_logs
                .create(NewTimeLog {
                    person_id: app.config.tracker.person_id.clone(),
                    job_id: job.unwrap_or_else(|| app.config.tracker.default_job_id.clone()),
                    task_id: None,
                    start,
                    end,
                    duration_minutes: minutes,
                    break_ms: 0,
                    billable: !non_billable,
                    note,
                    source: TimeLogSource::Manual,
                })
                .await?;
            msg_success!(Message::TimeLogCreated(log.duration_minutes));
            Ok(())
        }
        Some(LogCommand::Rm { id, yes }) => {
            let id = resolve(app, &id).await?;
            if !yes {
                let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(Message::ConfirmDeleteTimeLog(id.clone()).to_string())
                    .default(false)
                    .interact()?;
                if !confirmed {
                    msg_info!(Message::OperationCancelled);
                    return Ok(());
                }
            }
            app.time_logs.soft_delete(&id).await?;
            msg_success!(Message::TimeLogDeleted(id));
            Ok(())
        }
        Some(LogCommand::Invoice { id, invoice }) => {
            let id = resolve(app, &id).await?;
            app.time_logs.link_invoice(&id, &invoice).await?;
            msg_success!(Message::TimeLogInvoiced(id, invoice));
            Ok(())
        }
    }
}

async fn handle_list(app: &App, week: Option<String>, job: Option<String>) -> Result<()> {
    let week = match week {
        Some(week) => week,
        None => app.stats.current_bucket()?,
    };
    let filter = match job {
        Some(job) => TimeLogFilter::ByJobWeek(job, week.clone()),
        None => TimeLogFilter::ByWeek(week.clone()),
    };
    let logs: Vec<TimeLog> = app
        .time_logs
        .fetch(filter)
        .await?
        .into_iter()
        .filter(|log| log.person_id == app.config.tracker.person_id)
        .collect();

    if logs.is_empty() {
        msg_info!(Message::NoTimeLogs);
        return Ok(());
    }
    msg_print!(Message::TimeLogsHeader(week), true);
    View::time_logs(&logs, app.tz()?);
    Ok(())
}

async fn resolve(app: &App, prefix: &str) -> Result<String> {
    let logs = app
        .time_logs
        .fetch(TimeLogFilter::ByPerson(app.config.tracker.person_id.clone()))
        .await?;
    resolve_prefix(prefix, logs.iter().map(|log| log.id.as_str()))
}
