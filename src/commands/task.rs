use super::app::{resolve_prefix, App};
use crate::libs::messages::Message;
use crate::libs::tracker::{ActiveTask, CompleteTask, StartTask};
use crate::libs::view::View;
use crate::{msg_info, msg_print};
use anyhow::Result;
use clap::{Args, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

#[derive(Debug, Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    command: Option<TaskCommand>,
}

#[derive(Debug, Subcommand)]
enum TaskCommand {
    /// Start a new task timer
    Start {
        name: Option<String>,
        #[arg(short, long)]
        job: Option<String>,
        #[arg(long)]
        non_billable: bool,
    },
    Pause {
        id: Option<String>,
    },
    Resume {
        id: Option<String>,
    },
    /// Log the task's time and stop tracking it
    Done {
        id: Option<String>,
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Discard a task without logging time
    Rm {
        id: Option<String>,
        #[arg(short, long)]
        yes: bool,
    },
    List,
}

pub async fn cmd(app: &App, args: TaskArgs) -> Result<()> {
    match args.command {
        Some(TaskCommand::Start { name, job, non_billable }) => handle_start(app, name, job, non_billable).await,
        Some(TaskCommand::Pause { id }) => {
            let id = pick(app, id).await?;
            app.tasks.pause(&id).await?;
            Ok(())
        }
        Some(TaskCommand::Resume { id }) => {
            let id = pick(app, id).await?;
            app.tasks.resume(&id).await?;
            Ok(())
        }
        Some(TaskCommand::Done { id, note }) => {
            let id = pick(app, id).await?;
            app.tasks
                .complete(
                    &id,
                    CompleteTask {
                        note,
                        billable: None,
                    },
                )
                .await?;
            Ok(())
        }
        Some(TaskCommand::Rm { id, yes }) => handle_delete(app, id, yes).await,
        Some(TaskCommand::List) | None => handle_list(app).await,
    }
}

async fn handle_start(app: &App, name: Option<String>, job: Option<String>, non_billable: bool) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => Input::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptTaskName.to_string())
            .interact_text()?,
    };
    app.tasks
        .start(StartTask {
            job_id: job,
            task_id: None,
            name,
            billable: !non_billable,
        })
        .await?;
    Ok(())
}

async fn handle_delete(app: &App, id: Option<String>, yes: bool) -> Result<()> {
    let id = pick(app, id).await?;
    if !yes {
        let name = app.tasks.get(&id).await?.map(|t| t.name).unwrap_or_else(|| id.clone());
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::ConfirmDeleteTask(name).to_string())
            .default(false)
            .interact()?;
        if !confirmed {
            msg_info!(Message::OperationCancelled);
            return Ok(());
        }
    }
    app.tasks.delete(&id).await?;
    Ok(())
}

async fn handle_list(app: &App) -> Result<()> {
    let tasks = app.tasks.list().await?;
    if tasks.is_empty() {
        msg_info!(Message::NoActiveTasks);
        return Ok(());
    }
    msg_print!(Message::ActiveTasksHeader, true);
    View::active_tasks(&tasks, app.clock.now());
    Ok(())
}

/// Resolves an id prefix, or asks when none was given.
async fn pick(app: &App, id: Option<String>) -> Result<String> {
    let tasks: Vec<ActiveTask> = app.tasks.list().await?;
    if let Some(prefix) = id {
        return resolve_prefix(&prefix, tasks.iter().map(|t| t.id.as_str()));
    }
    if tasks.is_empty() {
        crate::msg_bail_anyhow!(Message::NoActiveTasks);
    }
    let labels: Vec<String> = tasks.iter().map(|t| format!("{} ({})", t.name, t.status)).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(Message::SelectTask.to_string())
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(tasks[selection].id.clone())
}
