use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoachError;
use crate::types::ChatTurn;

/// Persists per-user conversation history. Append-only from the loop's point
/// of view: the loop loads, appends turns, and saves the whole list back.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Vec<ChatTurn>, CoachError>;

    async fn save(&self, user_id: &str, turns: &[ChatTurn]) -> Result<(), CoachError>;
}

/// Keeps histories in memory. Fine for tests and single-process demos.
#[derive(Default)]
pub struct MemoryHistoryStore {
    histories: RwLock<HashMap<String, Vec<ChatTurn>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&self, user_id: &str) -> Result<Vec<ChatTurn>, CoachError> {
        let histories = self.histories.read().await;
        Ok(histories.get(user_id).cloned().unwrap_or_default())
    }

    async fn save(&self, user_id: &str, turns: &[ChatTurn]) -> Result<(), CoachError> {
        let mut histories = self.histories.write().await;
        histories.insert(user_id.to_string(), turns.to_vec());
        Ok(())
    }
}

/// Saves each user's history to disk as JSON.
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl FileHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self, user_id: &str) -> Result<Vec<ChatTurn>, CoachError> {
        match tokio::fs::read_to_string(self.path(user_id)).await {
            Ok(json) => {
                serde_json::from_str(&json).map_err(|e| CoachError::History(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(CoachError::History(e.to_string())),
        }
    }

    async fn save(&self, user_id: &str, turns: &[ChatTurn]) -> Result<(), CoachError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CoachError::History(e.to_string()))?;
        let json = serde_json::to_string_pretty(turns)
            .map_err(|e| CoachError::History(e.to_string()))?;
        tokio::fs::write(self.path(user_id), json)
            .await
            .map_err(|e| CoachError::History(e.to_string()))?;
        Ok(())
    }
}
