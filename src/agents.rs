//! Registry of named remote executors.
//!
//! Each registered agent gets its own [`AgentClient`] and a private mirror of
//! the tasks sent to it. The mirror is best-effort local bookkeeping: a
//! synthetic `submitted` snapshot is written before every outbound call so a
//! crash mid-flight still leaves an observable record, and the authoritative
//! task returned by the remote overwrites it afterwards.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::client::AgentClient;
use crate::errors::{EngineError, EngineResult};
use crate::protocol::{AgentCard, Message, SendTaskParams, Task, TaskState, TaskStatus};
use crate::task::TaskAndHistory;

pub struct AgentManager {
    http: reqwest::Client,
    agents: RwLock<HashMap<String, Arc<AgentEntry>>>,
}

struct AgentEntry {
    endpoint: String,
    client: AgentClient,
    /// Flat upsert-by-task-id list; O(n) per save is acceptable at the low
    /// per-agent cardinality this is built for. Insertion-order suffix doubles
    /// as recency, which holds only absent reordering.
    mirror: RwLock<Vec<TaskAndHistory>>,
}

impl AgentEntry {
    /// Upsert a task into the mirror. A new entry records the outgoing message
    /// as its whole history; an existing entry keeps its history untouched —
    /// the remote's own reported history is never merged back in.
    async fn save_mirror(&self, task: Task, outgoing: &Message) {
        let mut mirror = self.mirror.write().await;
        match mirror.iter_mut().find(|entry| entry.task.id == task.id) {
            Some(entry) => entry.task = task,
            None => mirror.push(TaskAndHistory {
                task,
                history: vec![outgoing.clone()],
            }),
        }
    }
}

impl Default for AgentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentManager {
    pub fn new() -> Self {
        Self::with_http_client(reqwest::Client::new())
    }

    /// Share one pre-configured HTTP client across all registered agents.
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self {
            http,
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Register a named remote executor, or override an existing registration.
    ///
    /// When `card` is supplied, exchanges go straight to `card.url` and no
    /// discovery fetch happens; otherwise the card is resolved lazily from
    /// `endpoint` on first use.
    pub async fn register(
        &self,
        key: impl Into<String>,
        endpoint: impl Into<String>,
        card: Option<AgentCard>,
    ) -> EngineResult<()> {
        let key = key.into();
        let endpoint = endpoint.into();
        let client = match card {
            Some(card) => AgentClient::with_card_and_http_client(card, self.http.clone())?,
            None => AgentClient::with_http_client(endpoint.clone(), self.http.clone()),
        };
        let entry = Arc::new(AgentEntry {
            endpoint,
            client,
            mirror: RwLock::new(Vec::new()),
        });

        let mut agents = self.agents.write().await;
        if agents.insert(key.clone(), entry).is_some() {
            warn!(key = %key, "overriding existing agent registration");
        }
        Ok(())
    }

    /// Registered keys, unordered.
    pub async fn keys(&self) -> Vec<String> {
        self.agents.read().await.keys().cloned().collect()
    }

    /// The endpoint a key was registered with.
    pub async fn endpoint(&self, key: &str) -> EngineResult<String> {
        Ok(self.entry(key).await?.endpoint.clone())
    }

    async fn entry(&self, key: &str) -> EngineResult<Arc<AgentEntry>> {
        self.agents
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::AgentNotFound {
                key: key.to_string(),
            })
    }

    /// Send a task to the named remote executor.
    ///
    /// The synthetic pre-flight snapshot is persisted into the agent's mirror
    /// before the network call. A non-null result overwrites it with the
    /// authoritative task; a null result is tolerated and logged, leaving the
    /// snapshot in place.
    pub async fn send_task(
        &self,
        key: &str,
        params: SendTaskParams,
    ) -> EngineResult<Option<Task>> {
        let entry = self.entry(key).await?;

        let snapshot = Task {
            id: params.id.clone(),
            session_id: params.session_id.clone(),
            status: TaskStatus {
                state: TaskState::Submitted,
                timestamp: Some(Utc::now().to_rfc3339()),
                message: Some(params.message.clone()),
            },
            artifacts: Vec::new(),
            metadata: params.metadata.clone(),
        };
        entry.save_mirror(snapshot, &params.message).await;

        let outgoing = params.message.clone();
        match entry.client.send_task(params).await? {
            Some(task) => {
                entry.save_mirror(task.clone(), &outgoing).await;
                Ok(Some(task))
            }
            None => {
                warn!(key = %key, "remote executor returned no task for send");
                Ok(None)
            }
        }
    }

    /// Probe one registered agent's capability descriptor. A missing
    /// descriptor becomes `None` unless `raise_if_missing` is set; an unknown
    /// key is always an error.
    pub async fn agent_card(
        &self,
        key: &str,
        raise_if_missing: bool,
    ) -> EngineResult<Option<AgentCard>> {
        let entry = self.entry(key).await?;
        match entry.client.agent_card().await {
            Ok(card) => Ok(Some(card)),
            Err(EngineError::CardNotFound { .. }) if !raise_if_missing => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Probe all registered agents' capability descriptors.
    pub async fn agent_cards(
        &self,
        raise_if_missing: bool,
    ) -> EngineResult<HashMap<String, Option<AgentCard>>> {
        let agents: Vec<(String, Arc<AgentEntry>)> = self
            .agents
            .read()
            .await
            .iter()
            .map(|(key, entry)| (key.clone(), Arc::clone(entry)))
            .collect();

        let mut cards = HashMap::new();
        for (key, entry) in agents {
            match entry.client.agent_card().await {
                Ok(card) => {
                    cards.insert(key, Some(card));
                }
                Err(EngineError::CardNotFound { .. }) if !raise_if_missing => {
                    cards.insert(key, None);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(cards)
    }

    /// The most recently saved task in the agent's mirror, by insertion order.
    pub async fn latest_task(&self, key: &str) -> EngineResult<Option<Task>> {
        let entry = self.entry(key).await?;
        let mirror = entry.mirror.read().await;
        Ok(mirror.last().map(|data| data.task.clone()))
    }

    /// All mirrored tasks for an agent, oldest first.
    pub async fn mirrored_tasks(&self, key: &str) -> EngineResult<Vec<Task>> {
        let entry = self.entry(key).await?;
        let mirror = entry.mirror.read().await;
        Ok(mirror.iter().map(|data| data.task.clone()).collect())
    }
}
