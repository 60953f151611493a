mod common;

#[cfg(test)]
mod tests {
    use super::common::{at, Harness};
    use chrono::{DateTime, Duration, Utc};
    use punchclock::libs::report::{
        compute, DataSnapshot, Deal, Expense, Invoice, InvoiceStatus, Job, Payment, Product, ProductSale,
        ReportFilters, ReportWorker,
    };
    use punchclock::libs::time_log::{NewTimeLog, TimeLogSource};

    fn entry(person: &str, job: &str, start: DateTime<Utc>, minutes: i64, billable: bool) -> NewTimeLog {
        NewTimeLog {
            person_id: person.to_string(),
            job_id: job.to_string(),
            task_id: None,
            start,
            end: start + Duration::minutes(minutes),
            duration_minutes: minutes,
            break_ms: 0,
            billable,
            note: None,
            source: TimeLogSource::Manual,
        }
    }

    async fn seeded() -> (Harness, DataSnapshot) {
        let h = Harness::new(at(2025, 2, 1, 12, 0)).await;
        let logs = &h.app.time_logs;
        logs.create(entry("me", "site", at(2025, 1, 6, 9, 0), 90, true)).await.unwrap();
        logs.create(entry("me", "site", at(2025, 1, 7, 9, 0), 30, false)).await.unwrap();
        logs.create(entry("bob", "site", at(2025, 1, 6, 9, 0), 60, true)).await.unwrap();
        logs.create(entry("me", "audit", at(2025, 1, 20, 9, 0), 45, true)).await.unwrap();
        let gone = logs.create(entry("me", "audit", at(2025, 1, 21, 9, 0), 600, true)).await.unwrap();
        logs.soft_delete(&gone.id).await.unwrap();

        let db = &h.app.db;
        db.put(&Job {
            id: "site".into(),
            name: "Website".into(),
            client_id: Some("acme".into()),
            hourly_rate_cents: Some(6000),
        })
        .await
        .unwrap();
        db.put(&Job {
            id: "audit".into(),
            name: "Audit".into(),
            client_id: Some("globex".into()),
            hourly_rate_cents: None,
        })
        .await
        .unwrap();
        for (id, client, issued, total, status) in [
            ("inv-1", "acme", at(2025, 1, 10, 0, 0), 50_000, InvoiceStatus::Sent),
            ("inv-2", "globex", at(2025, 1, 25, 0, 0), 20_000, InvoiceStatus::Paid),
            ("inv-3", "acme", at(2025, 1, 11, 0, 0), 99_000, InvoiceStatus::Void),
        ] {
            db.put(&Invoice {
                id: id.into(),
                client_id: client.into(),
                job_id: None,
                issued_at: issued,
                total_cents: total,
                status,
            })
            .await
            .unwrap();
        }
        for (id, invoice, received, amount) in [
            ("pay-1", "inv-1", at(2025, 1, 15, 0, 0), 30_000),
            ("pay-2", "inv-2", at(2025, 1, 28, 0, 0), 20_000),
        ] {
            db.put(&Payment {
                id: id.into(),
                invoice_id: invoice.into(),
                received_at: received,
                amount_cents: amount,
            })
            .await
            .unwrap();
        }
        db.put(&Expense {
            id: "exp-1".into(),
            client_id: Some("acme".into()),
            job_id: Some("site".into()),
            incurred_at: at(2025, 1, 12, 0, 0),
            amount_cents: 7_500,
            category: "hosting".into(),
        })
        .await
        .unwrap();
        for (id, client, stage, value) in [
            ("deal-1", "acme", "lead", 100_000),
            ("deal-2", "acme", "won", 40_000),
            ("deal-3", "globex", "lead", 10_000),
        ] {
            db.put(&Deal {
                id: id.into(),
                client_id: client.into(),
                stage: stage.into(),
                value_cents: value,
                created_at: at(2025, 1, 5, 0, 0),
            })
            .await
            .unwrap();
        }
        db.put(&Product {
            id: "mug".into(),
            name: "Mug".into(),
        })
        .await
        .unwrap();
        db.put(&ProductSale {
            id: "sale-1".into(),
            product_id: "mug".into(),
            client_id: Some("acme".into()),
            sold_at: at(2025, 1, 9, 0, 0),
            quantity: 3,
            unit_price_cents: 1_200,
        })
        .await
        .unwrap();

        let snapshot = DataSnapshot::load(db).await.unwrap();
        (h, snapshot)
    }

    #[tokio::test]
    async fn test_unfiltered_report() {
        let (_h, snapshot) = seeded().await;
        let report = compute(&ReportFilters::default(), &snapshot);

        assert_eq!(report.time_totals.total_minutes, 90 + 30 + 60 + 45);
        assert_eq!(report.time_totals.non_billable_minutes, 30);

        let site = report.time_by_job.iter().find(|j| j.job_id == "site").unwrap();
        assert_eq!(site.job_name, "Website");
        assert_eq!(site.totals.billable_minutes, 150);
        assert_eq!(site.billable_amount_cents, 15_000);
        let audit = report.time_by_job.iter().find(|j| j.job_id == "audit").unwrap();
        assert_eq!(audit.billable_amount_cents, 0);

        assert_eq!(report.time_by_person.len(), 2);
        assert_eq!(report.invoices.count, 2);
        assert_eq!(report.invoices.invoiced_cents, 70_000);
        assert_eq!(report.invoices.paid_cents, 50_000);
        assert_eq!(report.invoices.outstanding_cents, 20_000);

        assert_eq!(report.profit.revenue_cents, 50_000);
        assert_eq!(report.profit.expenses_cents, 7_500);
        assert_eq!(report.profit.profit_cents, 42_500);

        let lead = report.pipeline.iter().find(|s| s.stage == "lead").unwrap();
        assert_eq!(lead.count, 2);
        assert_eq!(lead.value_cents, 110_000);
        assert_eq!(report.product_sales[0].name, "Mug");
        assert_eq!(report.product_sales[0].revenue_cents, 3_600);
    }

    #[tokio::test]
    async fn test_client_and_range_filters() {
        let (_h, snapshot) = seeded().await;
        let filters = ReportFilters {
            from: Some(at(2025, 1, 6, 0, 0)),
            to: Some(at(2025, 1, 13, 0, 0)),
            client_id: Some("acme".into()),
            ..Default::default()
        };
        let report = compute(&filters, &snapshot);

        assert_eq!(report.time_totals.total_minutes, 180);
        assert!(report.time_by_job.iter().all(|j| j.job_id == "site"));
        assert_eq!(report.invoices.count, 1);
        // the payment lands after the range
        assert_eq!(report.profit.revenue_cents, 0);
        assert_eq!(report.profit.expenses_cents, 7_500);
        assert!(report.pipeline.is_empty());
        assert_eq!(report.product_sales.len(), 1);
    }

    #[tokio::test]
    async fn test_person_and_billable_filters() {
        let (_h, snapshot) = seeded().await;
        let filters = ReportFilters {
            person_id: Some("me".into()),
            billable: Some(true),
            ..Default::default()
        };
        let report = compute(&filters, &snapshot);

        assert_eq!(report.time_totals.total_minutes, 135);
        assert_eq!(report.time_totals.non_billable_minutes, 0);
        assert_eq!(report.time_by_person.len(), 1);
        assert_eq!(report.time_by_person[0].person_id, "me");
    }

    #[tokio::test]
    async fn test_worker_matches_direct_compute() {
        let (_h, snapshot) = seeded().await;
        let filters = ReportFilters {
            job_id: Some("audit".into()),
            ..Default::default()
        };
        let direct = compute(&filters, &snapshot);
        let pooled = ReportWorker.compute(filters, snapshot).await.unwrap();
        assert_eq!(direct, pooled);
        assert_eq!(pooled.time_totals.total_minutes, 45);
    }

    #[test]
    fn test_empty_snapshot() {
        let report = compute(&ReportFilters::default(), &DataSnapshot::default());
        assert_eq!(report.time_totals.total_minutes, 0);
        assert_eq!(report.invoices.outstanding_cents, 0);
        assert!(report.time_by_job.is_empty());
    }
}
