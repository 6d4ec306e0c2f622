use serde_json::{json, Value};

use crate::protocol::{error_codes, JsonRpcError};

/// Main error type for the task exchange engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // === Protocol Errors ===
    #[error("Failed to parse request: {reason}")]
    Parse { reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Method not implemented: {method}")]
    UnsupportedOperation { method: String },

    // === Task Errors ===
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    // === Registry Errors ===
    #[error("Agent not found: {key}")]
    AgentNotFound { key: String },

    // === Outbound Errors ===
    #[error("Agent card not found at {url}: {reason}")]
    CardNotFound { url: String, reason: String },

    #[error("Remote agent error {code}: {message}")]
    RemoteAgent {
        code: i32,
        message: String,
        data: Option<Value>,
    },

    #[error("Network error: {operation}: {reason}")]
    Network { operation: String, reason: String },

    // === Storage / System Errors ===
    #[error("Store error: {operation}: {reason}")]
    Store { operation: String, reason: String },

    #[error("Internal error: {reason}")]
    Internal { reason: String, data: Option<Value> },
}

impl EngineError {
    /// Internal error without auxiliary data.
    pub fn internal(reason: impl Into<String>) -> Self {
        EngineError::Internal {
            reason: reason.into(),
            data: None,
        }
    }

    /// Map this error to the numeric error envelope sent to a remote caller.
    ///
    /// Unrecognized failure kinds normalize to `INTERNAL_ERROR` with whatever
    /// diagnostic payload is available attached as `data`.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            EngineError::Parse { .. } => JsonRpcError {
                code: error_codes::PARSE_ERROR,
                message: self.to_string(),
                data: None,
            },
            EngineError::InvalidRequest { .. } => JsonRpcError {
                code: error_codes::INVALID_REQUEST,
                message: self.to_string(),
                data: None,
            },
            EngineError::MethodNotFound { .. } => JsonRpcError {
                code: error_codes::METHOD_NOT_FOUND,
                message: self.to_string(),
                data: None,
            },
            EngineError::InvalidParams { .. } => JsonRpcError {
                code: error_codes::INVALID_PARAMS,
                message: self.to_string(),
                data: None,
            },
            EngineError::UnsupportedOperation { .. } => JsonRpcError {
                code: error_codes::UNSUPPORTED_OPERATION,
                message: self.to_string(),
                data: None,
            },
            EngineError::TaskNotFound { task_id } => JsonRpcError {
                code: error_codes::TASK_NOT_FOUND,
                message: self.to_string(),
                data: Some(json!({ "id": task_id })),
            },
            EngineError::RemoteAgent {
                code,
                message,
                data,
            } => JsonRpcError {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            EngineError::Internal { data, .. } => JsonRpcError {
                code: error_codes::INTERNAL_ERROR,
                message: self.to_string(),
                data: data.clone(),
            },
            EngineError::AgentNotFound { .. }
            | EngineError::CardNotFound { .. }
            | EngineError::Network { .. }
            | EngineError::Store { .. } => JsonRpcError {
                code: error_codes::INTERNAL_ERROR,
                message: self.to_string(),
                data: None,
            },
        }
    }
}

/// Convenience type alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::Parse {
            reason: error.to_string(),
        }
    }
}
