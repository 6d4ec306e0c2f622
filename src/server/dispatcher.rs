use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::executor::{CompletionHandle, TaskContext, TaskExecutor};
use crate::errors::{EngineError, EngineResult};
use crate::protocol::{
    GetTaskParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, SendTaskParams, Task,
    JSONRPC_VERSION,
};
use crate::task::{task_manager, InMemoryTaskStore, TaskStore};

/// Binds inbound protocol requests to the task state machine and the executor,
/// producing exactly one terminal response per request.
pub struct RequestDispatcher {
    store: Arc<dyn TaskStore>,
    executor: Arc<dyn TaskExecutor>,
}

impl RequestDispatcher {
    pub fn new(store: Arc<dyn TaskStore>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self { store, executor }
    }

    /// Convenience constructor backed by the default in-memory store.
    pub fn in_memory(executor: Arc<dyn TaskExecutor>) -> Self {
        Self::new(Arc::new(InMemoryTaskStore::new()), executor)
    }

    /// Handle a raw JSON request body. Malformed JSON yields a parse-error
    /// envelope with a null id.
    pub async fn handle_json(&self, raw: &str) -> JsonRpcResponse {
        match serde_json::from_str::<JsonRpcRequest>(raw) {
            Ok(request) => self.handle(request).await,
            Err(err) => JsonRpcResponse::error(
                None,
                EngineError::Parse {
                    reason: err.to_string(),
                }
                .to_rpc_error(),
            ),
        }
    }

    /// Handle one decoded request, producing the terminal response envelope.
    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match self.dispatch(&request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                debug!(method = %request.method, code = err.code, "request failed");
                JsonRpcResponse::error(id, err)
            }
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(EngineError::InvalidRequest {
                reason: format!("unsupported protocol version: {:?}", request.jsonrpc),
            }
            .to_rpc_error());
        }

        match request.method.as_str() {
            "tasks/send" => {
                let params: SendTaskParams = parse_params(request).map_err(rpc)?;
                let task = self.send_task(params).await?;
                to_result(task)
            }
            "tasks/get" => {
                let params: GetTaskParams = parse_params(request).map_err(rpc)?;
                let task = self.get_task(params).await.map_err(rpc)?;
                to_result(task)
            }
            "tasks/cancel" | "tasks/sendSubscribe" => Err(EngineError::UnsupportedOperation {
                method: request.method.clone(),
            }
            .to_rpc_error()),
            other => Err(EngineError::MethodNotFound {
                method: other.to_string(),
            }
            .to_rpc_error()),
        }
    }

    /// Load-or-create the task, persist the pre-notification snapshot, hand
    /// control to the executor, and wait for the first status completion.
    async fn send_task(&self, params: SendTaskParams) -> Result<Task, JsonRpcError> {
        let existing = self.store.load(&params.id).await.map_err(rpc)?;
        let data = task_manager::load_or_create(existing, &params);
        self.store.save(&data).await.map_err(rpc)?;

        let ctx = TaskContext::new(&data, params.message.clone());
        let (handle, response) = CompletionHandle::new(data, Arc::clone(&self.store));

        if let Err(err) = self.executor.execute(ctx, handle.clone()).await {
            warn!(task_id = %params.id, error = %err, "executor returned an error");
            handle.fail(err).await;
        }
        drop(handle);

        match response.await {
            Ok(outcome) => outcome,
            // Every handle was dropped without a completion: the dispatch can
            // no longer finish, so report it instead of pending forever.
            Err(_) => Err(EngineError::internal(format!(
                "executor finished without responding to task {}",
                params.id
            ))
            .to_rpc_error()),
        }
    }

    async fn get_task(&self, params: GetTaskParams) -> EngineResult<Task> {
        match self.store.load(&params.id).await? {
            // History is deliberately withheld: the result is the task alone.
            Some(data) => Ok(data.task),
            None => Err(EngineError::TaskNotFound {
                task_id: params.id,
            }),
        }
    }
}

fn rpc(err: EngineError) -> JsonRpcError {
    err.to_rpc_error()
}

fn to_result(task: Task) -> Result<Value, JsonRpcError> {
    serde_json::to_value(task)
        .map_err(|err| EngineError::internal(format!("failed to encode task: {err}")).to_rpc_error())
}

fn parse_params<T: DeserializeOwned>(request: &JsonRpcRequest) -> EngineResult<T> {
    let params = request
        .params
        .clone()
        .ok_or_else(|| EngineError::InvalidParams {
            reason: format!("missing params for {}", request.method),
        })?;
    serde_json::from_value(params).map_err(|err| EngineError::InvalidParams {
        reason: err.to_string(),
    })
}
