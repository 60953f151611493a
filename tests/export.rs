mod common;

#[cfg(test)]
mod tests {
    use super::common::at;
    use chrono::Duration;
    use punchclock::libs::export::{collect, export, ExportEntity, ExportError, ExportFormat, ExportMessage};
    use punchclock::libs::report::{DataSnapshot, Expense, Invoice, InvoiceStatus, Payment, ReportFilters};

    fn expenses(count: usize) -> DataSnapshot {
        let expenses = (0..count)
            .map(|i| Expense {
                id: format!("exp-{i}"),
                client_id: Some(if i % 2 == 0 { "acme" } else { "globex" }.to_string()),
                job_id: None,
                incurred_at: at(2025, 1, 6, 9, 0) + Duration::hours(i as i64),
                amount_cents: 100 * (i as i64 + 1),
                category: "travel, misc".to_string(),
            })
            .collect();
        DataSnapshot {
            expenses,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_csv_header_written_once() {
        let rx = export(ExportFormat::Csv, ExportEntity::Expenses, ReportFilters::default(), expenses(7), 3);
        let (filename, body) = collect(rx).await.unwrap();

        assert!(filename.starts_with("expenses-"));
        assert!(filename.ends_with(".csv"));
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("id,client_id,job_id,incurred_at"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("id,")).count(), 1);
        // fields with commas are quoted
        assert!(lines[1].contains("\"travel, misc\""));
    }

    #[tokio::test]
    async fn test_json_chunks_form_one_array() {
        let rx = export(ExportFormat::Json, ExportEntity::Expenses, ReportFilters::default(), expenses(5), 2);
        let (filename, body) = collect(rx).await.unwrap();

        assert!(filename.ends_with(".json"));
        let parsed: Vec<Expense> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[4].id, "exp-4");
    }

    #[tokio::test]
    async fn test_empty_json_export_is_valid() {
        let rx = export(ExportFormat::Json, ExportEntity::Deals, ReportFilters::default(), DataSnapshot::default(), 10);
        let (_, body) = collect(rx).await.unwrap();
        assert_eq!(body, "[]");
    }

    fn billing() -> DataSnapshot {
        let invoices = [("inv-1", "acme", Some("site")), ("inv-2", "globex", None), ("inv-3", "acme", None)]
            .into_iter()
            .map(|(id, client, job)| Invoice {
                id: id.to_string(),
                client_id: client.to_string(),
                job_id: job.map(str::to_string),
                issued_at: at(2025, 1, 6, 9, 0),
                total_cents: 10_000,
                status: InvoiceStatus::Sent,
            })
            .collect();
        let payments = [("pay-1", "inv-1"), ("pay-2", "inv-2"), ("pay-3", "inv-3"), ("pay-4", "inv-1")]
            .into_iter()
            .enumerate()
            .map(|(i, (id, invoice))| Payment {
                id: id.to_string(),
                invoice_id: invoice.to_string(),
                received_at: at(2025, 1, 8, 9, 0) + Duration::hours(i as i64),
                amount_cents: 2_500,
            })
            .collect();
        DataSnapshot {
            invoices,
            payments,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_payments_follow_their_invoice_client_and_job() {
        let by_client = ReportFilters {
            client_id: Some("acme".to_string()),
            ..Default::default()
        };
        let rx = export(ExportFormat::Json, ExportEntity::Payments, by_client, billing(), 10);
        let (_, body) = collect(rx).await.unwrap();
        let parsed: Vec<Payment> = serde_json::from_str(&body).unwrap();
        let ids: Vec<&str> = parsed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["pay-1", "pay-3", "pay-4"]);

        let by_job = ReportFilters {
            job_id: Some("site".to_string()),
            ..Default::default()
        };
        let rx = export(ExportFormat::Json, ExportEntity::Payments, by_job, billing(), 10);
        let (_, body) = collect(rx).await.unwrap();
        let parsed: Vec<Payment> = serde_json::from_str(&body).unwrap();
        let ids: Vec<&str> = parsed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["pay-1", "pay-4"]);
    }

    #[tokio::test]
    async fn test_stream_error_surfaces_from_collect() {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tx.send(ExportMessage::Chunk("id".to_string())).await.unwrap();
        tx.send(ExportMessage::Error("disk full".to_string())).await.unwrap();
        drop(tx);

        let err = collect(rx).await.unwrap_err();
        assert!(matches!(err, ExportError::Stream(ref e) if e == "disk full"));
        assert_eq!(err.to_string(), "export failed: disk full");
    }

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let filters = ReportFilters {
            client_id: Some("acme".to_string()),
            ..Default::default()
        };
        let mut rx = export(ExportFormat::Csv, ExportEntity::Expenses, filters, expenses(6), 2);

        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        match &messages[0] {
            ExportMessage::Metadata { mime_type, .. } => assert_eq!(mime_type, "text/csv"),
            other => panic!("expected metadata first, got {other:?}"),
        }
        let chunks = messages.iter().filter(|m| matches!(m, ExportMessage::Chunk(_))).count();
        assert_eq!(chunks, 2);
        assert_eq!(messages.last(), Some(&ExportMessage::End { rows: 3 }));
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_producer() {
        let mut rx = export(ExportFormat::Csv, ExportEntity::Expenses, ReportFilters::default(), expenses(100), 1);
        assert!(matches!(rx.recv().await, Some(ExportMessage::Metadata { .. })));
        drop(rx);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
