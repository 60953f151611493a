use crate::db::db::Db;
use crate::db::store::StoreError;
use crate::libs::tracker::{ActiveTask, INDEX_PERSON};

/// Persisted active tasks, including completed and discarded ones.
#[derive(Clone)]
pub struct ActiveTasks {
    db: Db,
}

impl ActiveTasks {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn put(&self, task: &ActiveTask) -> Result<(), StoreError> {
        self.db.put(task).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<ActiveTask>, StoreError> {
        self.db.get(id).await
    }

    /// Tasks of `person_id` that are neither completed nor deleted, oldest first.
    pub async fn live_for(&self, person_id: &str) -> Result<Vec<ActiveTask>, StoreError> {
        let mut tasks: Vec<ActiveTask> = self.db.query(INDEX_PERSON, person_id).await?;
        tasks.retain(ActiveTask::is_live);
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }
}
