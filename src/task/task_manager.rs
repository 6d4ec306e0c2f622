//! Pure state-machine and merge logic for the task lifecycle.
//!
//! Everything here is a total function over `(TaskAndHistory, update)` pairs:
//! no I/O, no locking. Callers (the request dispatcher and its completion
//! handles) are responsible for loading the current pair, applying a function,
//! and persisting the result.

use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

use super::task_store::TaskAndHistory;
use crate::protocol::{Artifact, Message, MessageRole, SendTaskParams, Task, TaskState, TaskStatus};

/// An incremental update reported by an executor through a completion handle:
/// either a partial status or a batch of artifacts.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    Status(StatusUpdate),
    Artifacts(Vec<Artifact>),
}

/// A partial status. The timestamp is always assigned here at merge time,
/// never supplied by the caller.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub state: TaskState,
    pub message: Option<Message>,
}

impl From<StatusUpdate> for TaskUpdate {
    fn from(update: StatusUpdate) -> Self {
        TaskUpdate::Status(update)
    }
}

impl From<Artifact> for TaskUpdate {
    fn from(artifact: Artifact) -> Self {
        TaskUpdate::Artifacts(vec![artifact])
    }
}

impl From<Vec<Artifact>> for TaskUpdate {
    fn from(artifacts: Vec<Artifact>) -> Self {
        TaskUpdate::Artifacts(artifacts)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Apply one update to a task/history pair, returning the merged pair.
pub fn apply_update(current: &TaskAndHistory, update: &TaskUpdate) -> TaskAndHistory {
    let mut next = current.clone();
    match update {
        TaskUpdate::Status(status) => apply_status_update(&mut next, status),
        TaskUpdate::Artifacts(artifacts) => {
            for artifact in artifacts {
                apply_artifact_update(&mut next.task, artifact);
            }
        }
    }
    next
}

/// Shallow-merge a partial status over the current one and stamp the merge
/// time. An incoming agent message is appended to history; user messages do
/// not arrive on this path and are ignored if one does.
fn apply_status_update(data: &mut TaskAndHistory, update: &StatusUpdate) {
    if let Some(message) = &update.message {
        if message.role == MessageRole::Agent {
            data.history.push(message.clone());
        } else {
            debug!(task_id = %data.task.id, "dropping non-agent message from status update");
        }
    }
    data.task.status = TaskStatus {
        state: update.state,
        timestamp: Some(now_rfc3339()),
        message: update
            .message
            .clone()
            .or_else(|| data.task.status.message.take()),
    };
}

/// Merge a single artifact into a task's artifact list.
fn apply_artifact_update(task: &mut Task, update: &Artifact) {
    // Identity: the artifact carrying an equal index wins, then the first
    // artifact with an equal name. An update with neither is always new.
    let existing = update
        .index
        .and_then(|index| {
            task.artifacts
                .iter()
                .position(|artifact| artifact.index == Some(index))
        })
        .or_else(|| {
            update.name.as_ref().and_then(|name| {
                task.artifacts
                    .iter()
                    .position(|artifact| artifact.name.as_ref() == Some(name))
            })
        });

    match existing {
        Some(slot) if update.append == Some(true) => {
            let artifact = &mut task.artifacts[slot];
            artifact.parts.extend(update.parts.iter().cloned());
            if let Some(metadata) = &update.metadata {
                artifact
                    .metadata
                    .get_or_insert_with(HashMap::new)
                    .extend(metadata.clone());
            }
            if update.last_chunk.is_some() {
                artifact.last_chunk = update.last_chunk;
            }
            if update.description.is_some() {
                artifact.description = update.description.clone();
            }
        }
        Some(slot) => task.artifacts[slot] = update.clone(),
        None => task.artifacts.push(update.clone()),
    }

    // Once any artifact carries an explicit index, the whole list is kept
    // sorted by it on every mutation. Missing indices sort as 0, so ordering
    // among unindexed artifacts (or duplicates of one index) relies on sort
    // stability.
    if task.artifacts.iter().any(|artifact| artifact.index.is_some()) {
        task.artifacts
            .sort_by_key(|artifact| artifact.index.unwrap_or(0));
    }
}

/// Build the pair a `tasks/send` request operates on: a fresh `submitted`
/// task for an unseen id, or the existing pair with the incoming message
/// appended and the re-submission transition applied.
///
/// This is the only path that appends *user* messages to history; agent
/// messages arrive solely through [`apply_update`].
pub fn load_or_create(existing: Option<TaskAndHistory>, params: &SendTaskParams) -> TaskAndHistory {
    match existing {
        None => TaskAndHistory {
            task: Task {
                id: params.id.clone(),
                session_id: params.session_id.clone(),
                status: TaskStatus {
                    state: TaskState::Submitted,
                    timestamp: Some(now_rfc3339()),
                    message: None,
                },
                artifacts: Vec::new(),
                metadata: params.metadata.clone(),
            },
            history: vec![params.message.clone()],
        },
        Some(mut data) => {
            data.history.push(params.message.clone());
            resubmit(&mut data.task.status);
            data
        }
    }
}

/// Lifecycle transition for a send request against an existing task.
///
/// Re-sending to a finished task restarts it rather than rejecting it: the
/// terminal states go back to `submitted` with the status message cleared. A
/// task waiting on input resumes `working` and keeps its message. Active
/// states are untouched.
fn resubmit(status: &mut TaskStatus) {
    match status.state {
        TaskState::Completed | TaskState::Failed | TaskState::Canceled => {
            status.state = TaskState::Submitted;
            status.message = None;
            status.timestamp = Some(now_rfc3339());
        }
        TaskState::InputRequired => {
            status.state = TaskState::Working;
            status.timestamp = Some(now_rfc3339());
        }
        TaskState::Submitted | TaskState::Working | TaskState::Unknown => {}
    }
}
