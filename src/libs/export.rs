//! Streaming CSV/JSON export.
//!
//! [`export`] returns a channel receiver instead of a finished string. The
//! producer sends a [`ExportMessage::Metadata`] first, then the encoded rows
//! in chunks of at most `chunk_rows` records, then [`ExportMessage::End`].
//! The channel is bounded, so a slow consumer throttles the producer, and a
//! dropped receiver stops it at the next send.

use crate::libs::report::{filter_time_logs, DataSnapshot, ReportFilters};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 4;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer could not be flushed: {0}")]
    Flush(String),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("encoded rows are not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// The producer reported a failure over the stream.
    #[error("export failed: {0}")]
    Stream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportEntity {
    TimeLogs,
    Invoices,
    Payments,
    Expenses,
    Deals,
    ProductSales,
}

impl ExportEntity {
    pub fn slug(&self) -> &'static str {
        match self {
            ExportEntity::TimeLogs => "time_logs",
            ExportEntity::Invoices => "invoices",
            ExportEntity::Payments => "payments",
            ExportEntity::Expenses => "expenses",
            ExportEntity::Deals => "deals",
            ExportEntity::ProductSales => "product_sales",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportMessage {
    Metadata { filename: String, mime_type: String },
    Chunk(String),
    /// Encoding failed; nothing follows.
    Error(String),
    End { rows: usize },
}

pub fn export(
    format: ExportFormat,
    entity: ExportEntity,
    filters: ReportFilters,
    snapshot: DataSnapshot,
    chunk_rows: usize,
) -> mpsc::Receiver<ExportMessage> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let chunk_rows = chunk_rows.max(1);
    tokio::spawn(async move {
        let filename = format!(
            "{}-{}.{}",
            entity.slug(),
            Utc::now().format("%Y%m%d-%H%M%S"),
            format.extension()
        );
        let metadata = ExportMessage::Metadata {
            filename,
            mime_type: format.mime_type().to_string(),
        };
        if tx.send(metadata).await.is_err() {
            return;
        }

        let invoices_client = |client_id: &str| filters.client_matches(Some(client_id));
        match entity {
            ExportEntity::TimeLogs => {
                let rows: Vec<_> = filter_time_logs(&filters, &snapshot).into_iter().cloned().collect();
                stream_rows(&tx, rows, format, chunk_rows).await
            }
            ExportEntity::Invoices => {
                let rows: Vec<_> = snapshot
                    .invoices
                    .iter()
                    .filter(|i| filters.in_range(i.issued_at) && invoices_client(&i.client_id))
                    .filter(|i| filters.job_matches(i.job_id.as_deref()))
                    .cloned()
                    .collect();
                stream_rows(&tx, rows, format, chunk_rows).await
            }
            ExportEntity::Payments => {
                let invoices: HashMap<&str, _> = snapshot.invoices.iter().map(|i| (i.id.as_str(), i)).collect();
                let rows: Vec<_> = snapshot
                    .payments
                    .iter()
                    .filter(|p| filters.in_range(p.received_at))
                    .filter(|p| {
                        let invoice = invoices.get(p.invoice_id.as_str());
                        filters.client_matches(invoice.map(|i| i.client_id.as_str()))
                            && filters.job_matches(invoice.and_then(|i| i.job_id.as_deref()))
                    })
                    .cloned()
                    .collect();
                stream_rows(&tx, rows, format, chunk_rows).await
            }
            ExportEntity::Expenses => {
                let rows: Vec<_> = snapshot
                    .expenses
                    .iter()
                    .filter(|e| filters.in_range(e.incurred_at) && filters.client_matches(e.client_id.as_deref()))
                    .filter(|e| filters.job_matches(e.job_id.as_deref()))
                    .cloned()
                    .collect();
                stream_rows(&tx, rows, format, chunk_rows).await
            }
            ExportEntity::Deals => {
                let rows: Vec<_> = snapshot
                    .deals
                    .iter()
                    .filter(|d| filters.in_range(d.created_at) && invoices_client(&d.client_id))
                    .cloned()
                    .collect();
                stream_rows(&tx, rows, format, chunk_rows).await
            }
            ExportEntity::ProductSales => {
                let rows: Vec<_> = snapshot
                    .product_sales
                    .iter()
                    .filter(|s| filters.in_range(s.sold_at) && filters.client_matches(s.client_id.as_deref()))
                    .cloned()
                    .collect();
                stream_rows(&tx, rows, format, chunk_rows).await
            }
        }
    });
    rx
}

async fn stream_rows<T: Serialize>(tx: &mpsc::Sender<ExportMessage>, rows: Vec<T>, format: ExportFormat, chunk_rows: usize) {
    let total = rows.len();
    if format == ExportFormat::Json && tx.send(ExportMessage::Chunk("[".to_string())).await.is_err() {
        return;
    }
    for (index, chunk) in rows.chunks(chunk_rows).enumerate() {
        let encoded = match format {
            ExportFormat::Csv => encode_csv(chunk, index == 0),
            ExportFormat::Json => encode_json(chunk, index == 0),
        };
        let message = match encoded {
            Ok(text) => ExportMessage::Chunk(text),
            Err(e) => {
                let _ = tx.send(ExportMessage::Error(e.to_string())).await;
                return;
            }
        };
        if tx.send(message).await.is_err() {
            debug!("export consumer went away after {} chunk(s)", index);
            return;
        }
    }
    if format == ExportFormat::Json && tx.send(ExportMessage::Chunk("]".to_string())).await.is_err() {
        return;
    }
    let _ = tx.send(ExportMessage::End { rows: total }).await;
}

fn encode_csv<T: Serialize>(rows: &[T], with_headers: bool) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new().has_headers(with_headers).from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| ExportError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

fn encode_json<T: Serialize>(rows: &[T], first: bool) -> Result<String, ExportError> {
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        if i > 0 || !first {
            out.push(',');
        }
        out.push_str(&serde_json::to_string(row)?);
    }
    Ok(out)
}

/// Drains an export stream into a single string. Used by the CLI and tests.
pub async fn collect(mut rx: mpsc::Receiver<ExportMessage>) -> Result<(String, String), ExportError> {
    let mut filename = String::new();
    let mut body = String::new();
    while let Some(message) = rx.recv().await {
        match message {
            ExportMessage::Metadata { filename: name, .. } => filename = name,
            ExportMessage::Chunk(chunk) => body.push_str(&chunk),
            ExportMessage::Error(e) => return Err(ExportError::Stream(e)),
            ExportMessage::End { .. } => break,
        }
    }
    Ok((filename, body))
}
