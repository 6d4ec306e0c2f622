//! Outbound client for a single remote executor.
//!
//! Resolves the executor's capability descriptor from a well-known path (or a
//! descriptor supplied at construction), then performs request/response
//! exchanges against the endpoint the descriptor names.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult};
use crate::protocol::{
    AgentCard, GetTaskParams, JsonRpcId, JsonRpcRequest, JsonRpcResponse, SendTaskParams, Task,
    JSONRPC_VERSION,
};

/// Well-known path where a remote executor publishes its agent card.
pub const AGENT_CARD_PATH: &str = ".well-known/agent-card.json";

pub struct AgentClient {
    http: reqwest::Client,
    base_url: String,
    card: RwLock<Option<AgentCard>>,
}

impl AgentClient {
    /// Client that discovers the agent card lazily from `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    /// Same as [`Self::new`] with a pre-configured `reqwest::Client`
    /// (timeouts, proxies, default headers).
    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            card: RwLock::new(None),
        }
    }

    /// Client for an already-known agent card; no discovery fetch happens.
    pub fn with_card(card: AgentCard) -> EngineResult<Self> {
        Self::with_card_and_http_client(card, reqwest::Client::new())
    }

    pub fn with_card_and_http_client(
        card: AgentCard,
        http: reqwest::Client,
    ) -> EngineResult<Self> {
        if card.url.is_empty() {
            return Err(EngineError::InvalidParams {
                reason: "agent card does not contain a service endpoint url".to_string(),
            });
        }
        Ok(Self {
            http,
            base_url: card.url.clone(),
            card: RwLock::new(Some(card)),
        })
    }

    /// The capability descriptor for the remote executor, fetched once and
    /// cached. Any discovery failure is reported as
    /// [`EngineError::CardNotFound`] so callers can choose to tolerate it.
    pub async fn agent_card(&self) -> EngineResult<AgentCard> {
        if let Some(card) = self.card.read().await.as_ref() {
            return Ok(card.clone());
        }

        let mut cached = self.card.write().await;
        if let Some(card) = cached.as_ref() {
            return Ok(card.clone());
        }
        let card = self.fetch_agent_card().await?;
        *cached = Some(card.clone());
        Ok(card)
    }

    async fn fetch_agent_card(&self) -> EngineResult<AgentCard> {
        let card_url = format!("{}/{}", self.base_url, AGENT_CARD_PATH);

        let response = self
            .http
            .get(&card_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| EngineError::CardNotFound {
                url: card_url.clone(),
                reason: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(EngineError::CardNotFound {
                url: card_url,
                reason: format!("HTTP {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|err| EngineError::CardNotFound {
                url: card_url,
                reason: format!("invalid agent card: {err}"),
            })
    }

    /// Submit a task to the remote executor. The result is the acknowledged
    /// task, or `None` when the remote returns an empty result.
    pub async fn send_task(&self, params: SendTaskParams) -> EngineResult<Option<Task>> {
        self.exchange("tasks/send", params).await
    }

    /// Fetch a task snapshot from the remote executor.
    pub async fn get_task(&self, params: GetTaskParams) -> EngineResult<Option<Task>> {
        self.exchange("tasks/get", params).await
    }

    async fn exchange<TParams: Serialize>(
        &self,
        method: &str,
        params: TParams,
    ) -> EngineResult<Option<Task>> {
        match self.post_rpc(method, params).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|err| {
                EngineError::internal(format!("malformed task in {method} response: {err}"))
            }),
        }
    }

    /// One request/response exchange against the endpoint named by the agent
    /// card, returning the raw `result` payload.
    async fn post_rpc<TParams: Serialize>(
        &self,
        method: &str,
        params: TParams,
    ) -> EngineResult<Option<Value>> {
        let card = self.agent_card().await?;
        if card.url.is_empty() {
            return Err(EngineError::internal(
                "agent card does not contain a service endpoint url",
            ));
        }

        let request_id = JsonRpcId::String(Uuid::new_v4().to_string());
        let request = JsonRpcRequest::new(
            request_id.clone(),
            method,
            serde_json::to_value(params)
                .map_err(|err| EngineError::internal(format!("failed to encode params: {err}")))?,
        );

        let response = self
            .http
            .post(&card.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| EngineError::Internal {
                reason: format!("transport failure during {method}"),
                data: Some(Value::String(err.to_string())),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| EngineError::Internal {
            reason: format!("failed to read {method} response body"),
            data: Some(Value::String(err.to_string())),
        })?;

        if !status.is_success() {
            // A structured error body wins over the transport status.
            if let Ok(envelope) = serde_json::from_str::<JsonRpcResponse>(&body) {
                if let Some(error) = envelope.error {
                    return Err(EngineError::RemoteAgent {
                        code: error.code,
                        message: error.message,
                        data: error.data,
                    });
                }
            }
            return Err(EngineError::Network {
                operation: method.to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let envelope: JsonRpcResponse = serde_json::from_str(&body).map_err(|err| {
            EngineError::internal(format!("malformed {method} response envelope: {err}"))
        })?;
        if envelope.jsonrpc != JSONRPC_VERSION {
            return Err(EngineError::internal(format!(
                "unexpected protocol version in {method} response: {:?}",
                envelope.jsonrpc
            )));
        }
        if let Some(resp_id) = &envelope.id {
            if *resp_id != request_id {
                warn!(method, "response id does not match request id");
            }
        }
        if let Some(error) = envelope.error {
            return Err(EngineError::RemoteAgent {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        Ok(envelope.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AgentCapabilities;

    fn card(url: &str) -> AgentCard {
        AgentCard {
            name: "Test".to_string(),
            description: None,
            url: url.to_string(),
            version: None,
            provider: None,
            capabilities: AgentCapabilities::default(),
            skills: Vec::new(),
        }
    }

    #[test]
    fn test_with_card_requires_endpoint_url() {
        assert!(matches!(
            AgentClient::with_card(card("")),
            Err(EngineError::InvalidParams { .. })
        ));
    }

    #[tokio::test]
    async fn test_supplied_card_is_cached() {
        let client = AgentClient::with_card(card("http://agent.local/rpc")).unwrap();
        let cached = client.agent_card().await.unwrap();
        assert_eq!(cached.url, "http://agent.local/rpc");
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = AgentClient::new("http://agent.local/");
        assert_eq!(client.base_url, "http://agent.local");
    }
}
