//! Work session commands: clock in, breaks, clock out.

use super::app::App;
use crate::libs::error::{RecoveryAction, TrackerError};
use crate::libs::messages::Message;
use crate::libs::session::{ClockIn, DurationWarning};
use crate::libs::session_manager::{ClockOutOutcome, Resolution};
use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use tracing::debug;

#[derive(Debug, Args)]
pub struct InArgs {
    /// Job to book the session on; defaults to the configured job
    #[arg(short, long)]
    job: Option<String>,

    #[arg(short, long)]
    task: Option<String>,

    /// Record the session as non-billable
    #[arg(long)]
    non_billable: bool,

    #[arg(short, long)]
    note: Option<String>,
}

pub async fn clock_in(app: &App, args: InArgs) -> Result<()> {
    app.sessions
        .clock_in(ClockIn {
            job_id: args.job,
            task_id: args.task,
            billable: !args.non_billable,
            note: args.note,
        })
        .await?;
    Ok(())
}

pub async fn start_break(app: &App) -> Result<()> {
    app.sessions.start_break().await?;
    Ok(())
}

pub async fn end_break(app: &App) -> Result<()> {
    app.sessions.end_break().await?;
    Ok(())
}

pub async fn clock_out(app: &App) -> Result<()> {
    let confirm = |warning: &DurationWarning| {
        let prompt = match warning {
            DurationWarning::TooLong { hours, .. } => Message::ConfirmLongSession(*hours),
            DurationWarning::ZeroDuration => Message::ConfirmZeroSession,
        };
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt.to_string())
            .default(false)
            .interact()
            .unwrap_or(false)
    };

    let outcome = match app.sessions.clock_out(&confirm).await {
        Ok(outcome) => outcome,
        Err(TrackerError::Unconfirmed(warning)) => {
            debug!("clock-out declined: {}", warning);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let ClockOutOutcome::PendingWrite { actions, .. } = outcome {
        resolve(app, actions).await?;
    }
    Ok(())
}

/// Asks what to do with a failed clock-out until it is settled.
async fn resolve(app: &App, mut actions: Vec<RecoveryAction>) -> Result<()> {
    loop {
        let labels: Vec<&str> = actions.iter().map(RecoveryAction::label).collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::SelectRecoveryAction.to_string())
            .items(&labels)
            .default(0)
            .interact()?;

        match app.sessions.resolve_pending(actions[selection]).await? {
            Resolution::StillPending { actions: next, .. } => actions = next,
            Resolution::Completed(_) | Resolution::SavedLocally | Resolution::Discarded => return Ok(()),
        }
    }
}
