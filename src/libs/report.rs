//! Batch reports over a full data snapshot.
//!
//! [`compute`] is a pure function of a [`DataSnapshot`] and [`ReportFilters`].
//! [`ReportWorker`] moves an owned snapshot onto the blocking pool so large
//! datasets never stall the async runtime. Money is integer cents.
//!
//! Clients, jobs, invoices, payments, expenses, deals, products and product
//! sales are maintained elsewhere; this module only reads them.

use crate::db::db::{Db, Document};
use crate::db::store::StoreError;
use crate::libs::error::{Result, TrackerError};
use crate::libs::time_log::TimeLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

macro_rules! document {
    ($type:ty, $collection:literal) => {
        impl Document for $type {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Client {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub client_id: Option<String>,
    #[serde(default)]
    pub hourly_rate_cents: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Void,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub client_id: String,
    pub job_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub total_cents: i64,
    pub status: InvoiceStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub received_at: DateTime<Utc>,
    pub amount_cents: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Expense {
    pub id: String,
    pub client_id: Option<String>,
    pub job_id: Option<String>,
    pub incurred_at: DateTime<Utc>,
    pub amount_cents: i64,
    pub category: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Deal {
    pub id: String,
    pub client_id: String,
    pub stage: String,
    pub value_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProductSale {
    pub id: String,
    pub product_id: String,
    pub client_id: Option<String>,
    pub sold_at: DateTime<Utc>,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

document!(Client, "clients");
document!(Job, "jobs");
document!(Invoice, "invoices");
document!(Payment, "payments");
document!(Expense, "expenses");
document!(Deal, "deals");
document!(Product, "products");
document!(ProductSale, "product_sales");

/// Owned copy of every entity a report reads.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DataSnapshot {
    pub time_logs: Vec<TimeLog>,
    pub clients: Vec<Client>,
    pub jobs: Vec<Job>,
    pub invoices: Vec<Invoice>,
    pub payments: Vec<Payment>,
    pub expenses: Vec<Expense>,
    pub deals: Vec<Deal>,
    pub products: Vec<Product>,
    pub product_sales: Vec<ProductSale>,
}

impl DataSnapshot {
    pub async fn load(db: &Db) -> std::result::Result<Self, StoreError> {
        Ok(DataSnapshot {
            time_logs: db.scan().await?,
            clients: db.scan().await?,
            jobs: db.scan().await?,
            invoices: db.scan().await?,
            payments: db.scan().await?,
            expenses: db.scan().await?,
            deals: db.scan().await?,
            products: db.scan().await?,
            product_sales: db.scan().await?,
        })
    }
}

/// All filters are optional; `from`/`to` form a half-open range.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ReportFilters {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub client_id: Option<String>,
    pub job_id: Option<String>,
    pub person_id: Option<String>,
    pub billable: Option<bool>,
}

impl ReportFilters {
    pub fn in_range(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts < to)
    }

    pub fn client_matches(&self, client_id: Option<&str>) -> bool {
        match &self.client_id {
            Some(wanted) => client_id == Some(wanted.as_str()),
            None => true,
        }
    }

    pub fn job_matches(&self, job_id: Option<&str>) -> bool {
        match &self.job_id {
            Some(wanted) => job_id == Some(wanted.as_str()),
            None => true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeTotals {
    pub billable_minutes: i64,
    pub non_billable_minutes: i64,
    pub total_minutes: i64,
}

impl TimeTotals {
    fn add(&mut self, minutes: i64, billable: bool) {
        if billable {
            self.billable_minutes += minutes;
        } else {
            self.non_billable_minutes += minutes;
        }
        self.total_minutes += minutes;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct JobTime {
    pub job_id: String,
    pub job_name: String,
    pub totals: TimeTotals,
    /// Billable minutes at the job's hourly rate.
    pub billable_amount_cents: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PersonTime {
    pub person_id: String,
    pub totals: TimeTotals,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub count: usize,
    pub invoiced_cents: i64,
    pub paid_cents: i64,
    pub outstanding_cents: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Profit {
    pub revenue_cents: i64,
    pub expenses_cents: i64,
    pub profit_cents: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StageTotal {
    pub stage: String,
    pub count: usize,
    pub value_cents: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProductTotal {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub time_by_job: Vec<JobTime>,
    pub time_by_person: Vec<PersonTime>,
    pub time_totals: TimeTotals,
    pub invoices: InvoiceTotals,
    pub profit: Profit,
    pub pipeline: Vec<StageTotal>,
    pub product_sales: Vec<ProductTotal>,
}

/// Time logs that pass every filter, deleted ones excluded.
pub fn filter_time_logs<'a>(filters: &ReportFilters, snapshot: &'a DataSnapshot) -> Vec<&'a TimeLog> {
    let job_clients: HashMap<&str, Option<&str>> =
        snapshot.jobs.iter().map(|j| (j.id.as_str(), j.client_id.as_deref())).collect();
    snapshot
        .time_logs
        .iter()
        .filter(|log| !log.is_deleted())
        .filter(|log| filters.in_range(log.start))
        .filter(|log| filters.job_matches(Some(log.job_id.as_str())))
        .filter(|log| filters.person_id.as_ref().map_or(true, |p| *p == log.person_id))
        .filter(|log| filters.billable.map_or(true, |b| b == log.billable))
        .filter(|log| filters.client_matches(job_clients.get(log.job_id.as_str()).copied().flatten()))
        .collect()
}

pub fn compute(filters: &ReportFilters, snapshot: &DataSnapshot) -> Report {
    let jobs: HashMap<&str, &Job> = snapshot.jobs.iter().map(|j| (j.id.as_str(), j)).collect();
    let logs = filter_time_logs(filters, snapshot);

    let mut time_totals = TimeTotals::default();
    let mut by_job: BTreeMap<&str, TimeTotals> = BTreeMap::new();
    let mut by_person: BTreeMap<&str, TimeTotals> = BTreeMap::new();
    for log in &logs {
        time_totals.add(log.duration_minutes, log.billable);
        by_job.entry(log.job_id.as_str()).or_default().add(log.duration_minutes, log.billable);
        by_person.entry(log.person_id.as_str()).or_default().add(log.duration_minutes, log.billable);
    }
    let time_by_job = by_job
        .into_iter()
        .map(|(job_id, totals)| {
            let job = jobs.get(job_id);
            let rate = job.and_then(|j| j.hourly_rate_cents).unwrap_or(0);
            JobTime {
                job_id: job_id.to_string(),
                job_name: job.map(|j| j.name.clone()).unwrap_or_else(|| job_id.to_string()),
                billable_amount_cents: (totals.billable_minutes * rate + 30) / 60,
                totals,
            }
        })
        .collect();
    let time_by_person = by_person
        .into_iter()
        .map(|(person_id, totals)| PersonTime {
            person_id: person_id.to_string(),
            totals,
        })
        .collect();

    let invoices: Vec<&Invoice> = snapshot
        .invoices
        .iter()
        .filter(|i| i.status != InvoiceStatus::Void)
        .filter(|i| filters.in_range(i.issued_at))
        .filter(|i| filters.client_matches(Some(i.client_id.as_str())))
        .filter(|i| filters.job_matches(i.job_id.as_deref()))
        .collect();
    let invoice_ids: HashMap<&str, &Invoice> = invoices.iter().map(|i| (i.id.as_str(), *i)).collect();
    let paid_cents: i64 = snapshot
        .payments
        .iter()
        .filter(|p| invoice_ids.contains_key(p.invoice_id.as_str()))
        .map(|p| p.amount_cents)
        .sum();
    let invoiced_cents: i64 = invoices.iter().map(|i| i.total_cents).sum();

    let all_invoices: HashMap<&str, &Invoice> = snapshot.invoices.iter().map(|i| (i.id.as_str(), i)).collect();
    let revenue_cents: i64 = snapshot
        .payments
        .iter()
        .filter(|p| filters.in_range(p.received_at))
        .filter(|p| {
            let invoice = all_invoices.get(p.invoice_id.as_str());
            filters.client_matches(invoice.map(|i| i.client_id.as_str()))
                && filters.job_matches(invoice.and_then(|i| i.job_id.as_deref()))
        })
        .map(|p| p.amount_cents)
        .sum();
    let expenses_cents: i64 = snapshot
        .expenses
        .iter()
        .filter(|e| filters.in_range(e.incurred_at))
        .filter(|e| filters.client_matches(e.client_id.as_deref()))
        .filter(|e| filters.job_matches(e.job_id.as_deref()))
        .map(|e| e.amount_cents)
        .sum();

    let mut stages: BTreeMap<&str, StageTotal> = BTreeMap::new();
    for deal in snapshot
        .deals
        .iter()
        .filter(|d| filters.in_range(d.created_at))
        .filter(|d| filters.client_matches(Some(d.client_id.as_str())))
    {
        let stage = stages.entry(deal.stage.as_str()).or_insert_with(|| StageTotal {
            stage: deal.stage.clone(),
            count: 0,
            value_cents: 0,
        });
        stage.count += 1;
        stage.value_cents += deal.value_cents;
    }

    let products: HashMap<&str, &Product> = snapshot.products.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut sales: BTreeMap<&str, ProductTotal> = BTreeMap::new();
    for sale in snapshot
        .product_sales
        .iter()
        .filter(|s| filters.in_range(s.sold_at))
        .filter(|s| filters.client_matches(s.client_id.as_deref()))
    {
        let total = sales.entry(sale.product_id.as_str()).or_insert_with(|| ProductTotal {
            product_id: sale.product_id.clone(),
            name: products
                .get(sale.product_id.as_str())
                .map(|p| p.name.clone())
                .unwrap_or_else(|| sale.product_id.clone()),
            quantity: 0,
            revenue_cents: 0,
        });
        total.quantity += sale.quantity;
        total.revenue_cents += sale.quantity * sale.unit_price_cents;
    }

    Report {
        time_by_job,
        time_by_person,
        time_totals,
        invoices: InvoiceTotals {
            count: invoices.len(),
            invoiced_cents,
            paid_cents,
            outstanding_cents: invoiced_cents - paid_cents,
        },
        profit: Profit {
            revenue_cents,
            expenses_cents,
            profit_cents: revenue_cents - expenses_cents,
        },
        pipeline: stages.into_values().collect(),
        product_sales: sales.into_values().collect(),
    }
}

/// Runs report computation on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportWorker;

impl ReportWorker {
    pub async fn compute(&self, filters: ReportFilters, snapshot: DataSnapshot) -> Result<Report> {
        tokio::task::spawn_blocking(move || compute(&filters, &snapshot))
            .await
            .map_err(|e| TrackerError::Worker(e.to_string()))
    }
}
