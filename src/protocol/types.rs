use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Task exchange wire types.
///
/// A `Task` is the unit of work tracked by the engine: created on the first
/// `tasks/send` for an unseen id, mutated only through the merge logic in
/// [`crate::task::task_manager`], and never deleted by this subsystem.

/// Lifecycle state of a task.
///
/// `Completed`, `Failed` and `Canceled` are terminal for the current request
/// cycle but not for the task id: a later `tasks/send` restarts the task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,
    /// ISO 8601 datetime, assigned by the engine at the moment an update is
    /// applied. Never client-supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "sessionId")]
    pub session_id: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub artifacts: Vec<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Message {
    /// A plain text message from the requester.
    pub fn user_text(text: impl Into<String>) -> Self {
        Message {
            role: MessageRole::User,
            parts: vec![Part::Text {
                text: text.into(),
                metadata: None,
            }],
            metadata: None,
        }
    }

    /// A plain text message from the executor.
    pub fn agent_text(text: impl Into<String>) -> Self {
        Message {
            role: MessageRole::Agent,
            parts: vec![Part::Text {
                text: text.into(),
                metadata: None,
            }],
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, serde_json::Value>>,
    },
    File {
        file: FileContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, serde_json::Value>>,
    },
    Data {
        data: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, serde_json::Value>>,
    },
}

/// File payload carried by a [`Part::File`]. Exactly one of `bytes` (base64)
/// or `uri` is expected to be set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// A piece of executor output, assembled incrementally.
///
/// Identity within a task is by `index` when present and in range, else by
/// `name`; an artifact with neither is always appended as new.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "lastChunk")]
    pub last_chunk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

// ============================================================================
// Method Parameter Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendTaskParams {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "sessionId")]
    pub session_id: Option<String>,
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTaskParams {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_state_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskState::InputRequired).unwrap(),
            "\"input-required\""
        );
        let state: TaskState = serde_json::from_str("\"submitted\"").unwrap();
        assert_eq!(state, TaskState::Submitted);
    }

    #[test]
    fn test_part_tagged_by_type() {
        let part = Part::Text {
            text: "hi".to_string(),
            metadata: None,
        };
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["text"], "hi");
    }

    #[test]
    fn test_task_wire_field_names() {
        let task = Task {
            id: "t1".to_string(),
            session_id: Some("s1".to_string()),
            status: TaskStatus {
                state: TaskState::Submitted,
                timestamp: None,
                message: None,
            },
            artifacts: Vec::new(),
            metadata: None,
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["sessionId"], "s1");
        // Empty artifact list is omitted on the wire and restored on read.
        assert!(value.get("artifacts").is_none());

        let parsed: Task = serde_json::from_value(value).unwrap();
        assert!(parsed.artifacts.is_empty());
    }

    #[test]
    fn test_artifact_last_chunk_rename() {
        let artifact = Artifact {
            name: Some("out".to_string()),
            description: None,
            parts: Vec::new(),
            index: None,
            append: None,
            last_chunk: Some(true),
            metadata: None,
        };
        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(value["lastChunk"], true);
        assert!(value.get("last_chunk").is_none());
    }
}
