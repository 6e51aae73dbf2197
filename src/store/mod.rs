//! Remote system of record for tasks.
//!
//! [`TaskStore`] covers the four CRUD calls; [`ChangeFeed`] delivers change
//! notifications for the task collection. The REST/realtime pair speaks the
//! PostgREST + Phoenix channel contract, [`MemoryTaskStore`] backs tests and
//! `--demo`.

mod memory;
mod realtime;
mod rest;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

use crate::types::{Task, TaskPatch};

pub use memory::MemoryTaskStore;
pub use realtime::RealtimeFeed;
pub use rest::RestTaskStore;

pub const DEFAULT_TABLE: &str = "tasks";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is not configured: {0}")]
    Config(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode store response: {0}")]
    Decode(String),
    #[error("task {0} not found")]
    NotFound(Uuid),
    #[error("expected {expected} row(s) from store, got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },
}

impl StoreError {
    /// Stable code used by the CLI's JSON error envelope.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "STORE_NOT_CONFIGURED",
            Self::Http(_) => "STORE_UNREACHABLE",
            Self::Status { .. } => "STORE_HTTP_ERROR",
            Self::Decode(_) => "STORE_DECODE_ERROR",
            Self::NotFound(_) => "TASK_NOT_FOUND",
            Self::UnexpectedRowCount { .. } => "STORE_UNEXPECTED_ROWS",
        }
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks ordered by due date ascending, undated tasks last.
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    /// Inserts `task` with its client-assigned id and returns the stored row.
    async fn create(&self, task: &Task) -> Result<Task, StoreError>;

    async fn update(&self, id: Uuid, patch: &TaskPatch) -> Result<Task, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub task_id: Option<Uuid>,
}

pub trait ChangeFeed: Send + Sync {
    /// Starts forwarding change events into `sink` until the returned
    /// subscription is dropped. Must be called inside a tokio runtime.
    fn subscribe_changes(&self, sink: mpsc::UnboundedSender<ChangeEvent>) -> Subscription;
}

/// Background forwarding task; aborted on drop.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: Url,
    pub anon_key: String,
    pub table: String,
    pub request_timeout: Duration,
}

impl StoreConfig {
    pub fn new(
        base_url: Option<&str>,
        anon_key: Option<&str>,
        table: &str,
    ) -> Result<Self, StoreError> {
        let raw_url = base_url
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| StoreError::Config("missing store URL".to_string()))?;
        let anon_key = anon_key
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| StoreError::Config("missing anon key".to_string()))?;

        let base_url = Url::parse(raw_url)
            .map_err(|err| StoreError::Config(format!("invalid store URL '{raw_url}': {err}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(StoreError::Config(format!(
                "store URL must be http(s), got '{}'",
                base_url.scheme()
            )));
        }

        let table = table.trim();
        Ok(Self {
            base_url,
            anon_key: anon_key.to_string(),
            table: if table.is_empty() {
                DEFAULT_TABLE.to_string()
            } else {
                table.to_string()
            },
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn rest_endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base(), self.table)
    }

    /// `wss://…/realtime/v1/websocket?apikey=…&vsn=1.0.0` for an `https` base.
    pub fn realtime_endpoint(&self) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| StoreError::Config("cannot derive websocket URL".to_string()))?;
        let path = format!("{}/realtime/v1/websocket", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("apikey", &self.anon_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }
}

/// Every call fails with the configuration problem; the board stays usable
/// and shows an empty list.
#[derive(Debug, Clone)]
pub struct UnconfiguredStore {
    reason: String,
}

impl UnconfiguredStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> StoreError {
        StoreError::Config(self.reason.clone())
    }
}

#[async_trait]
impl TaskStore for UnconfiguredStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        Err(self.error())
    }

    async fn create(&self, _task: &Task) -> Result<Task, StoreError> {
        Err(self.error())
    }

    async fn update(&self, _id: Uuid, _patch: &TaskPatch) -> Result<Task, StoreError> {
        Err(self.error())
    }

    async fn delete(&self, _id: Uuid) -> Result<(), StoreError> {
        Err(self.error())
    }
}

/// Store plus optional change feed, chosen once at startup.
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn TaskStore>,
    pub feed: Option<Arc<dyn ChangeFeed>>,
    pub label: String,
}

impl Backend {
    pub fn remote(config: StoreConfig, realtime: bool) -> Result<Self, StoreError> {
        let label = config.base_url.host_str().unwrap_or("store").to_string();
        let feed: Option<Arc<dyn ChangeFeed>> = if realtime {
            Some(Arc::new(RealtimeFeed::new(&config)?))
        } else {
            None
        };
        Ok(Self {
            store: Arc::new(RestTaskStore::new(config)?),
            feed,
            label,
        })
    }

    pub fn memory(store: Arc<MemoryTaskStore>) -> Self {
        Self {
            feed: Some(store.clone() as Arc<dyn ChangeFeed>),
            store,
            label: "demo".to_string(),
        }
    }

    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self {
            store: Arc::new(UnconfiguredStore::new(reason)),
            feed: None,
            label: "offline".to_string(),
        }
    }
}
