//! Wire-level protocol types: the task/message/artifact data model, the agent
//! capability descriptor, and the JSON-RPC 2.0 envelope used by any
//! request/response binding.

pub mod agent_card;
pub mod json_rpc;
pub mod types;

pub use agent_card::{AgentCapabilities, AgentCard, AgentProvider, AgentSkill};
pub use json_rpc::{
    error_codes, JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
};
pub use types::{
    Artifact, FileContent, GetTaskParams, Message, MessageRole, Part, SendTaskParams, Task,
    TaskState, TaskStatus,
};
