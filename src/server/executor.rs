use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error};

use crate::errors::{EngineError, EngineResult};
use crate::protocol::{Artifact, JsonRpcError, Message, Task, TaskState};
use crate::task::{task_manager, StatusUpdate, TaskAndHistory, TaskStore, TaskUpdate};

/// Fixed agent message recorded by the bare-string `respond` shorthand.
const COMPLETION_TEXT: &str = "task completed";

/// The collaborator that performs the actual work for a `tasks/send` request.
///
/// Contract the engine relies on but cannot enforce: `respond` must be called
/// exactly once per notification. `accumulate_artifacts` may be called any
/// number of times before or interleaved with it. If the implementation
/// neither errors nor responds, the dispatch never completes; timeouts are the
/// transport layer's concern.
///
/// Returning an `Err` before `respond` has been called converts the failure
/// into a synthesized `failed` task status and a structured error for the
/// caller.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, ctx: TaskContext, handle: CompletionHandle) -> EngineResult<()>;
}

/// Ephemeral per-dispatch snapshot handed to the executor. Mutating it does
/// not mutate the stored task.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task: Task,
    /// The message that triggered this dispatch.
    pub user_message: Message,
    /// History as of the moment the request was accepted, including
    /// `user_message` as its last entry.
    pub history: Vec<Message>,
    cancelled: Arc<AtomicBool>,
}

impl TaskContext {
    pub(crate) fn new(data: &TaskAndHistory, user_message: Message) -> Self {
        Self {
            task: data.task.clone(),
            user_message,
            history: data.history.clone(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancellation probe. No engine path ever sets the flag; it exists so
    /// executors written against this contract keep working if cancellation is
    /// wired up by an outer layer.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Argument to [`CompletionHandle::respond`]: a finished status update, or a
/// bare text shorthand marking the task completed.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(StatusUpdate),
    Text(String),
}

impl From<StatusUpdate> for Reply {
    fn from(update: StatusUpdate) -> Self {
        Reply::Status(update)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

/// Mutable state of one in-flight `tasks/send` dispatch: the latest merged
/// snapshot and the pending protocol response. Exclusively owned by the
/// dispatch that created it; both completion handles share it by reference.
struct DispatchSession {
    latest: TaskAndHistory,
    store: Arc<dyn TaskStore>,
    responder: Option<oneshot::Sender<Result<Task, JsonRpcError>>>,
}

impl DispatchSession {
    /// Merge an update into the latest snapshot and persist the result. Later
    /// completions compound on earlier ones within the same dispatch.
    async fn apply_and_save(&mut self, update: &TaskUpdate) -> EngineResult<()> {
        let next = task_manager::apply_update(&self.latest, update);
        self.store.save(&next).await?;
        self.latest = next;
        Ok(())
    }

    /// Best-effort failure conversion: synthesize a `failed` status carrying
    /// the error text, persist it if possible, and finalize the structured
    /// error. A secondary persistence failure is logged and swallowed so it
    /// never masks the original error being reported.
    async fn fail(&mut self, err: EngineError) -> EngineError {
        let failed = TaskUpdate::Status(StatusUpdate {
            state: TaskState::Failed,
            message: Some(Message::agent_text(err.to_string())),
        });
        let next = task_manager::apply_update(&self.latest, &failed);
        match self.store.save(&next).await {
            Ok(()) => self.latest = next,
            Err(save_err) => {
                error!(task_id = %self.latest.task.id, error = %save_err,
                    "failed to persist synthesized failure status");
            }
        }
        self.finalize(Err(err.to_rpc_error()));
        err
    }

    /// Complete the protocol response. The first finalization wins; later
    /// outcomes are dropped with a diagnostic.
    fn finalize(&mut self, outcome: Result<Task, JsonRpcError>) {
        match self.responder.take() {
            Some(responder) => {
                // The receiver only disappears if the dispatch was aborted.
                let _ = responder.send(outcome);
            }
            None => debug!(
                task_id = %self.latest.task.id,
                "dispatch response already finalized; dropping outcome"
            ),
        }
    }
}

/// The pair of completion operations handed to an executor for one dispatch.
///
/// Cloneable so the executor can move copies into spawned work; all clones
/// share the same per-dispatch session.
#[derive(Clone)]
pub struct CompletionHandle {
    session: Arc<Mutex<DispatchSession>>,
}

impl CompletionHandle {
    pub(crate) fn new(
        latest: TaskAndHistory,
        store: Arc<dyn TaskStore>,
    ) -> (Self, oneshot::Receiver<Result<Task, JsonRpcError>>) {
        let (responder, response) = oneshot::channel();
        let session = DispatchSession {
            latest,
            store,
            responder: Some(responder),
        };
        (
            Self {
                session: Arc::new(Mutex::new(session)),
            },
            response,
        )
    }

    /// Final status completion; produces the protocol response.
    ///
    /// A bare string argument marks the task `completed` with the fixed agent
    /// message `"task completed"`; the string itself is only logged.
    ///
    /// On merge or persist failure the error has already been converted and
    /// reported to the caller when this returns `Err`.
    pub async fn respond(&self, reply: impl Into<Reply>) -> EngineResult<()> {
        let update = match reply.into() {
            Reply::Status(update) => update,
            Reply::Text(text) => {
                debug!(text = %text, "completion shorthand");
                StatusUpdate {
                    state: TaskState::Completed,
                    message: Some(Message::agent_text(COMPLETION_TEXT)),
                }
            }
        };

        let mut session = self.session.lock().await;
        match session.apply_and_save(&TaskUpdate::Status(update)).await {
            Ok(()) => {
                let task = session.latest.task.clone();
                session.finalize(Ok(task));
                Ok(())
            }
            Err(err) => Err(session.fail(err).await),
        }
    }

    /// Incremental artifact completion. Never finalizes the success response;
    /// a failure is converted and reported to the caller immediately rather
    /// than waiting for `respond`.
    pub async fn accumulate_artifacts(&self, artifacts: Vec<Artifact>) -> EngineResult<()> {
        let mut session = self.session.lock().await;
        match session
            .apply_and_save(&TaskUpdate::Artifacts(artifacts))
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => Err(session.fail(err).await),
        }
    }

    /// Single-artifact convenience form of [`Self::accumulate_artifacts`].
    pub async fn accumulate_artifact(&self, artifact: Artifact) -> EngineResult<()> {
        self.accumulate_artifacts(vec![artifact]).await
    }

    /// Used by the dispatcher when the executor returns an error without
    /// having finalized the response.
    pub(crate) async fn fail(&self, err: EngineError) -> EngineError {
        let mut session = self.session.lock().await;
        session.fail(err).await
    }
}
