//! Store calls run as tokio tasks; results come back to the UI thread as
//! [`StoreEvent`]s.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::store::{StoreError, TaskStore};
use crate::types::{Task, TaskPatch};

use super::task_list::OptimisticToken;

pub type StoreEvents = mpsc::UnboundedSender<StoreEvent>;

#[derive(Debug)]
pub enum StoreEvent {
    Fetched(Result<Vec<Task>, StoreError>),
    Created(Result<Task, StoreError>),
    Edited(Result<Task, StoreError>),
    Toggled {
        token: OptimisticToken,
        result: Result<Task, StoreError>,
    },
    Deleted {
        id: Uuid,
        token: Option<OptimisticToken>,
        result: Result<(), StoreError>,
    },
}

impl StoreEvent {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Fetched(_))
    }
}

pub fn spawn_fetch(store: Arc<dyn TaskStore>, events: StoreEvents) {
    tokio::spawn(async move {
        let result = store.list().await;
        debug!(ok = result.is_ok(), "fetch finished");
        let _ = events.send(StoreEvent::Fetched(result));
    });
}

pub fn spawn_create(store: Arc<dyn TaskStore>, events: StoreEvents, task: Task) {
    tokio::spawn(async move {
        let result = store.create(&task).await;
        let _ = events.send(StoreEvent::Created(result));
    });
}

pub fn spawn_edit(store: Arc<dyn TaskStore>, events: StoreEvents, id: Uuid, patch: TaskPatch) {
    tokio::spawn(async move {
        let result = store.update(id, &patch).await;
        let _ = events.send(StoreEvent::Edited(result));
    });
}

pub fn spawn_toggle(
    store: Arc<dyn TaskStore>,
    events: StoreEvents,
    token: OptimisticToken,
    completed: bool,
) {
    tokio::spawn(async move {
        let result = store
            .update(token.task_id(), &TaskPatch::completed(completed))
            .await;
        let _ = events.send(StoreEvent::Toggled { token, result });
    });
}

pub fn spawn_delete(
    store: Arc<dyn TaskStore>,
    events: StoreEvents,
    id: Uuid,
    token: Option<OptimisticToken>,
) {
    tokio::spawn(async move {
        let result = store.delete(id).await;
        let _ = events.send(StoreEvent::Deleted { id, token, result });
    });
}
