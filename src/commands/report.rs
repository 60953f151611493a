use super::app::{parse_local, App};
use crate::libs::messages::Message;
use crate::libs::report::{DataSnapshot, ReportFilters, ReportWorker};
use crate::libs::view::View;
use crate::msg_print;
use anyhow::Result;
use chrono_tz::Tz;
use clap::Args;

/// Filters shared by `report` and `export`.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Inclusive start date, `YYYY-MM-DD` in the configured time zone
    #[arg(long)]
    from: Option<String>,

    /// Exclusive end date
    #[arg(long)]
    to: Option<String>,

    #[arg(long)]
    client: Option<String>,

    #[arg(long)]
    job: Option<String>,

    #[arg(long)]
    person: Option<String>,

    /// Only billable (true) or non-billable (false) time
    #[arg(long)]
    billable: Option<bool>,
}

impl FilterArgs {
    pub fn to_filters(&self, tz: Tz) -> Result<ReportFilters> {
        Ok(ReportFilters {
            from: self.from.as_deref().map(|d| parse_local(d, tz)).transpose()?,
            to: self.to.as_deref().map(|d| parse_local(d, tz)).transpose()?,
            client_id: self.client.clone(),
            job_id: self.job.clone(),
            person_id: self.person.clone(),
            billable: self.billable,
        })
    }
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    filters: FilterArgs,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

pub async fn cmd(app: &App, args: ReportArgs) -> Result<()> {
    let filters = args.filters.to_filters(app.tz()?)?;
    let snapshot = DataSnapshot::load(&app.db).await?;
    let report = ReportWorker.compute(filters, snapshot).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    msg_print!(Message::ReportHeader, true);
    View::report(&report);
    Ok(())
}
