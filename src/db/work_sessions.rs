use crate::db::db::Db;
use crate::db::store::StoreError;
use crate::libs::session::{WorkSession, INDEX_OPEN};

/// Persisted work sessions.
#[derive(Clone)]
pub struct WorkSessions {
    db: Db,
}

impl WorkSessions {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn put(&self, session: &WorkSession) -> Result<(), StoreError> {
        self.db.put(session).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<WorkSession>, StoreError> {
        self.db.get(id).await
    }

    /// Open sessions of `person_id`, most recent clock-in first.
    pub async fn open_for(&self, person_id: &str) -> Result<Vec<WorkSession>, StoreError> {
        let mut sessions: Vec<WorkSession> = self.db.query(INDEX_OPEN, person_id).await?;
        sessions.retain(WorkSession::is_open);
        sessions.sort_by(|a, b| b.clock_in.cmp(&a.clock_in));
        Ok(sessions)
    }

    pub async fn all(&self) -> Result<Vec<WorkSession>, StoreError> {
        let mut sessions: Vec<WorkSession> = self.db.scan().await?;
        sessions.sort_by(|a, b| a.clock_in.cmp(&b.clock_in));
        Ok(sessions)
    }
}
