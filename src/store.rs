use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Goal, Task, WeeklySchedule};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("backing store error: {0}")]
    Backend(String),
}

/// Persistence for goals, tasks and schedules, always scoped by user id.
/// Each call is atomic from the orchestration core's point of view; any
/// transactional guarantees belong to the implementation.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn add_goal(&self, goal: Goal) -> Result<Goal, RepositoryError>;

    /// All goals for a user, newest first.
    async fn goals(&self, user_id: &str) -> Result<Vec<Goal>, RepositoryError>;

    /// Replace a stored goal. `NotFound` if the id does not exist for that
    /// user.
    async fn update_goal(&self, goal: Goal) -> Result<(), RepositoryError>;

    async fn add_task(&self, task: Task) -> Result<Task, RepositoryError>;

    async fn tasks(&self, user_id: &str) -> Result<Vec<Task>, RepositoryError>;

    async fn weekly_schedule(
        &self,
        user_id: &str,
    ) -> Result<Option<WeeklySchedule>, RepositoryError>;

    async fn save_schedule(
        &self,
        user_id: &str,
        schedule: WeeklySchedule,
    ) -> Result<(), RepositoryError>;
}

/// In-memory reference implementation, for tests and the demo.
#[derive(Default)]
pub struct MemoryRepository {
    goals: RwLock<HashMap<String, Vec<Goal>>>,
    tasks: RwLock<HashMap<String, Vec<Task>>>,
    schedules: RwLock<HashMap<String, WeeklySchedule>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn add_goal(&self, goal: Goal) -> Result<Goal, RepositoryError> {
        let mut goals = self.goals.write().await;
        goals
            .entry(goal.user_id.clone())
            .or_default()
            .insert(0, goal.clone());
        Ok(goal)
    }

    async fn goals(&self, user_id: &str) -> Result<Vec<Goal>, RepositoryError> {
        let goals = self.goals.read().await;
        Ok(goals.get(user_id).cloned().unwrap_or_default())
    }

    async fn update_goal(&self, goal: Goal) -> Result<(), RepositoryError> {
        let mut goals = self.goals.write().await;
        let stored = goals
            .get_mut(&goal.user_id)
            .and_then(|list| list.iter_mut().find(|g| g.id == goal.id))
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "goal",
                id: goal.id.clone(),
            })?;
        *stored = goal;
        Ok(())
    }

    async fn add_task(&self, task: Task) -> Result<Task, RepositoryError> {
        let mut tasks = self.tasks.write().await;
        tasks
            .entry(task.user_id.clone())
            .or_default()
            .insert(0, task.clone());
        Ok(task)
    }

    async fn tasks(&self, user_id: &str) -> Result<Vec<Task>, RepositoryError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(user_id).cloned().unwrap_or_default())
    }

    async fn weekly_schedule(
        &self,
        user_id: &str,
    ) -> Result<Option<WeeklySchedule>, RepositoryError> {
        let schedules = self.schedules.read().await;
        Ok(schedules.get(user_id).cloned())
    }

    async fn save_schedule(
        &self,
        user_id: &str,
        schedule: WeeklySchedule,
    ) -> Result<(), RepositoryError> {
        let mut schedules = self.schedules.write().await;
        schedules.insert(user_id.to_string(), schedule);
        Ok(())
    }
}
