use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::task_store::{TaskAndHistory, TaskStore};
use crate::errors::EngineResult;

/// In-memory implementation of [`TaskStore`].
///
/// An unordered map keyed by task id, guarded by an `RwLock`. Suitable for
/// development and testing; memory grows with the number of tasks and nothing
/// is ever evicted (retention is an external store concern).
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, TaskAndHistory>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all stored tasks. Primarily used in tests.
    pub async fn clear(&self) {
        self.tasks.write().await.clear();
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, data: &TaskAndHistory) -> EngineResult<()> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(data.task.id.clone(), data.clone());
        Ok(())
    }

    async fn load(&self, task_id: &str) -> EngineResult<Option<TaskAndHistory>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(task_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Message, Task, TaskState, TaskStatus};

    fn sample(id: &str) -> TaskAndHistory {
        TaskAndHistory {
            task: Task {
                id: id.to_string(),
                session_id: None,
                status: TaskStatus {
                    state: TaskState::Submitted,
                    timestamp: None,
                    message: None,
                },
                artifacts: Vec::new(),
                metadata: None,
            },
            history: vec![Message::user_text("hi")],
        }
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = InMemoryTaskStore::new();
        let data = sample("t1");
        store.save(&data).await.unwrap();

        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded, data);
    }

    #[tokio::test]
    async fn test_load_unknown_id() {
        let store = InMemoryTaskStore::new();
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemoryTaskStore::new();
        store.save(&sample("t1")).await.unwrap();

        let mut updated = sample("t1");
        updated.task.status.state = TaskState::Working;
        store.save(&updated).await.unwrap();

        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.task.status.state, TaskState::Working);
        assert_eq!(store.len().await, 1);
    }
}
