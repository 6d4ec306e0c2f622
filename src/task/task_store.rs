use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::EngineResult;
use crate::protocol::{Message, Task};

/// The atomic persisted unit: a task together with its message history.
///
/// The pairing is deliberate. A task and its history are never saved
/// independently, so a stored task can never imply messages that are not yet
/// recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskAndHistory {
    pub task: Task,
    pub history: Vec<Message>,
}

/// Persistence port for tasks and their histories.
///
/// The contract is two operations and nothing more: no transactionality,
/// versioning, or conflict detection. Writes are last-write-wins; callers must
/// not assume the store detects concurrent modification. The default
/// implementation is [`super::InMemoryTaskStore`]; a production binding
/// substitutes a durable backend behind the same two operations.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Save a task and its history (create or update).
    async fn save(&self, data: &TaskAndHistory) -> EngineResult<()>;

    /// Load a task and its history by task id. Returns `None` if unknown.
    async fn load(&self, task_id: &str) -> EngineResult<Option<TaskAndHistory>>;
}
