//! Console tables.

use crate::libs::formatter::{format_cents, format_clock, format_minutes};
use crate::libs::report::Report;
use crate::libs::session_manager::TimerSnapshot;
use crate::libs::stats::{CachedStats, WeeklyTotal};
use crate::libs::time_log::TimeLog;
use crate::libs::tracker::ActiveTask;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use prettytable::{row, Table};

pub struct View {}

impl View {
    pub fn session(snapshot: &TimerSnapshot, tz: Tz) {
        let Some(session) = &snapshot.session else {
            return;
        };
        let mut table = Table::new();
        table.add_row(row!["JOB", "STATUS", "CLOCK IN", "WORKED", "BREAK", "BREAKS"]);
        table.add_row(row![
            session.job_id,
            session.status,
            session.clock_in.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
            format_clock(snapshot.work_ms),
            format_clock(snapshot.break_ms),
            session.breaks.len()
        ]);
        table.printstd();
    }

    pub fn active_tasks(tasks: &[ActiveTask], now: DateTime<Utc>) {
        let mut table = Table::new();
        table.add_row(row!["#", "ID", "NAME", "JOB", "STATUS", "ELAPSED"]);
        for (index, task) in tasks.iter().enumerate() {
            table.add_row(row![
                index + 1,
                short_id(&task.id),
                task.name,
                task.job_id,
                task.status,
                format_clock(task.elapsed_ms_at(now))
            ]);
        }
        table.printstd();
    }

    pub fn time_logs(logs: &[TimeLog], tz: Tz) {
        let mut table = Table::new();
        table.add_row(row!["ID", "JOB", "START", "END", "MINUTES", "BILLABLE", "INVOICE", "NOTE"]);
        for log in logs {
            table.add_row(row![
                short_id(&log.id),
                log.job_id,
                log.start.with_timezone(&tz).format("%a %d %H:%M"),
                log.end.with_timezone(&tz).format("%H:%M"),
                log.duration_minutes,
                if log.billable { "yes" } else { "no" },
                log.invoice_id.as_deref().unwrap_or("-"),
                log.note.as_deref().unwrap_or("")
            ]);
        }
        let total: i64 = logs.iter().map(|l| l.duration_minutes).sum();
        table.add_row(row!["", "TOTAL", "", "", format_minutes(total), "", "", ""]);
        table.printstd();
    }

    pub fn week(stats: &CachedStats) {
        let mut table = Table::new();
        table.add_row(row!["JOB", "MINUTES", "HH:MM"]);
        for (job, minutes) in &stats.job_minutes {
            table.add_row(row![job, minutes, format_minutes(*minutes)]);
        }
        table.printstd();
    }

    pub fn weekly_totals(totals: &[WeeklyTotal]) {
        let mut table = Table::new();
        table.add_row(row!["WEEK", "MINUTES", "HH:MM", "JOBS"]);
        for total in totals {
            table.add_row(row![
                total.week_bucket,
                total.total_minutes,
                format_minutes(total.total_minutes),
                total.job_minutes.len()
            ]);
        }
        table.printstd();
    }

    pub fn report(report: &Report) {
        let mut time = Table::new();
        time.add_row(row!["JOB", "BILLABLE", "NON-BILLABLE", "TOTAL", "AMOUNT"]);
        for job in &report.time_by_job {
            time.add_row(row![
                job.job_name,
                format_minutes(job.totals.billable_minutes),
                format_minutes(job.totals.non_billable_minutes),
                format_minutes(job.totals.total_minutes),
                format_cents(job.billable_amount_cents)
            ]);
        }
        time.add_row(row![
            "TOTAL",
            format_minutes(report.time_totals.billable_minutes),
            format_minutes(report.time_totals.non_billable_minutes),
            format_minutes(report.time_totals.total_minutes),
            ""
        ]);
        time.printstd();

        let mut money = Table::new();
        money.add_row(row!["INVOICES", "INVOICED", "PAID", "OUTSTANDING", "REVENUE", "EXPENSES", "PROFIT"]);
        money.add_row(row![
            report.invoices.count,
            format_cents(report.invoices.invoiced_cents),
            format_cents(report.invoices.paid_cents),
            format_cents(report.invoices.outstanding_cents),
            format_cents(report.profit.revenue_cents),
            format_cents(report.profit.expenses_cents),
            format_cents(report.profit.profit_cents)
        ]);
        money.printstd();

        if !report.pipeline.is_empty() {
            let mut pipeline = Table::new();
            pipeline.add_row(row!["STAGE", "DEALS", "VALUE"]);
            for stage in &report.pipeline {
                pipeline.add_row(row![stage.stage, stage.count, format_cents(stage.value_cents)]);
            }
            pipeline.printstd();
        }

        if !report.product_sales.is_empty() {
            let mut products = Table::new();
            products.add_row(row!["PRODUCT", "QUANTITY", "REVENUE"]);
            for product in &report.product_sales {
                products.add_row(row![product.name, product.quantity, format_cents(product.revenue_cents)]);
            }
            products.printstd();
        }
    }
}

/// First block of a UUID, enough to pick a row by prefix.
pub fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}
