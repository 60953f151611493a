//! Data export command.
//!
//! Streams the selected records to a file chunk by chunk, so large tables
//! never sit in memory as one string.

use super::app::App;
use super::report::FilterArgs;
use crate::libs::export::{export, ExportEntity, ExportError, ExportFormat, ExportMessage};
use crate::libs::messages::Message;
use crate::libs::report::DataSnapshot;
use crate::{msg_info, msg_success};
use anyhow::Result;
use clap::Args;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(value_enum, default_value = "time-logs")]
    entity: ExportEntity,

    #[arg(short, long, value_enum, default_value = "csv")]
    format: ExportFormat,

    /// Output directory; defaults to the current one
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    filters: FilterArgs,
}

pub async fn cmd(app: &App, args: ExportArgs) -> Result<()> {
    let filters = args.filters.to_filters(app.tz()?)?;
    let snapshot = DataSnapshot::load(&app.db).await?;
    let mut rx = export(args.format, args.entity, filters, snapshot, app.config.tracker.export_chunk_rows);

    let dir = args.output.unwrap_or_else(|| PathBuf::from("."));
    let mut writer: Option<(PathBuf, BufWriter<File>)> = None;
    while let Some(message) = rx.recv().await {
        match message {
            ExportMessage::Metadata { filename, .. } => {
                let path = dir.join(&filename);
                msg_info!(Message::ExportStarted(filename));
                writer = Some((path.clone(), BufWriter::new(File::create(path)?)));
            }
            ExportMessage::Chunk(chunk) => {
                if let Some((_, out)) = writer.as_mut() {
                    out.write_all(chunk.as_bytes())?;
                }
            }
            ExportMessage::Error(e) => return Err(ExportError::Stream(e).into()),
            ExportMessage::End { .. } => break,
        }
    }

    if let Some((path, mut out)) = writer {
        out.flush()?;
        msg_success!(Message::ExportCompleted(path.display().to_string()));
    }
    Ok(())
}
