//! Persistence of derived statistics: the single cached snapshot and the
//! per-week rollups written by recomputation.

use crate::db::db::{Db, Document};
use crate::db::store::{IndexEntry, StoreError};
use crate::libs::stats::{CachedStats, WeeklyTotal};

/// Fixed id of the cached snapshot document.
pub const CACHE_ID: &str = "stats";

impl Document for CachedStats {
    const COLLECTION: &'static str = "stats_cache";

    fn id(&self) -> &str {
        CACHE_ID
    }
}

impl Document for WeeklyTotal {
    const COLLECTION: &'static str = "weekly_totals";

    fn id(&self) -> &str {
        &self.id
    }

    fn index(&self) -> Vec<IndexEntry> {
        vec![IndexEntry::new("week", self.week_bucket.as_str())]
    }
}

#[derive(Clone)]
pub struct StatsCache {
    db: Db,
}

impl StatsCache {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn load(&self) -> Result<Option<CachedStats>, StoreError> {
        self.db.get(CACHE_ID).await
    }

    pub async fn save(&self, stats: &CachedStats) -> Result<(), StoreError> {
        self.db.put(stats).await
    }

    pub async fn save_weekly(&self, total: &WeeklyTotal) -> Result<(), StoreError> {
        self.db.put(total).await
    }

    pub async fn weekly(&self, person_id: Option<&str>, week_bucket: &str) -> Result<Option<WeeklyTotal>, StoreError> {
        self.db.get(&WeeklyTotal::key(person_id, week_bucket)).await
    }

    /// All stored rollups, oldest week first.
    pub async fn weekly_history(&self) -> Result<Vec<WeeklyTotal>, StoreError> {
        let mut totals: Vec<WeeklyTotal> = self.db.scan().await?;
        totals.sort_by(|a, b| a.week_bucket.cmp(&b.week_bucket));
        Ok(totals)
    }
}
