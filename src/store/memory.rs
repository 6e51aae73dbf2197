use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::types::{Student, Subject, Task, TaskDraft, TaskPatch};

use super::{ChangeEvent, ChangeFeed, ChangeKind, StoreError, Subscription, TaskStore};

const CHANGE_CAPACITY: usize = 64;

/// Process-local store with the same ordering and change semantics as the
/// remote one.
#[derive(Debug)]
pub struct MemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
    changes: broadcast::Sender<ChangeEvent>,
    list_calls: AtomicUsize,
    failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::with_tasks(Vec::new())
    }
}

impl MemoryTaskStore {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            tasks: Mutex::new(tasks),
            changes,
            list_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            latency: Mutex::new(None),
        }
    }

    /// A handful of tasks spread around `today`, used by `--demo`.
    pub fn demo(today: NaiveDate) -> Self {
        let offset = |days: i64| {
            if days >= 0 {
                today.checked_add_days(Days::new(days.unsigned_abs()))
            } else {
                today.checked_sub_days(Days::new(days.unsigned_abs()))
            }
        };
        let seed = [
            ("Algebra worksheet", Subject::Math, Some(1), Student::Muhammad),
            ("Essay outline", Subject::English, Some(-2), Student::Mahveen),
            ("Map of rivers", Subject::Geography, Some(0), Student::Hadia),
            ("Surah memorisation", Subject::Islamiat, Some(5), Student::Muhammad),
            ("Typing practice", Subject::Ict, None, Student::Hadia),
        ];
        Self::with_tasks(
            seed.into_iter()
                .map(|(title, subject, days, student)| {
                    TaskDraft {
                        title: title.to_string(),
                        subject,
                        due_date: days.and_then(offset),
                        student,
                        notes: None,
                    }
                    .into_task(Uuid::new_v4())
                })
                .collect(),
        )
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// While set, every call fails with an HTTP 503 status error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut slot) = self.latency.lock() {
            *slot = latency;
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().clone()
    }

    /// Emits a change as if another client had written the row.
    pub fn notify(&self, event: ChangeEvent) {
        let _ = self.changes.send(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Task>> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn enter(&self) -> Result<(), StoreError> {
        let latency = self.latency.lock().ok().and_then(|slot| *slot);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                body: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        let mut tasks = self.snapshot();
        // Stable sort keeps insertion order among equal dates.
        tasks.sort_by_key(|task| (task.due_date.is_none(), task.due_date));
        Ok(tasks)
    }

    async fn create(&self, task: &Task) -> Result<Task, StoreError> {
        self.enter().await?;
        {
            let mut tasks = self.lock();
            if tasks.iter().any(|existing| existing.id == task.id) {
                return Err(StoreError::Status {
                    status: 409,
                    body: format!("duplicate key value violates unique constraint: {}", task.id),
                });
            }
            tasks.push(task.clone());
        }
        self.notify(ChangeEvent {
            kind: ChangeKind::Insert,
            task_id: Some(task.id),
        });
        Ok(task.clone())
    }

    async fn update(&self, id: Uuid, patch: &TaskPatch) -> Result<Task, StoreError> {
        self.enter().await?;
        let updated = {
            let mut tasks = self.lock();
            let task = tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or(StoreError::NotFound(id))?;
            patch.apply_to(task);
            task.needs_migration = false;
            task.clone()
        };
        self.notify(ChangeEvent {
            kind: ChangeKind::Update,
            task_id: Some(id),
        });
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.enter().await?;
        {
            let mut tasks = self.lock();
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            if tasks.len() == before {
                return Err(StoreError::NotFound(id));
            }
        }
        self.notify(ChangeEvent {
            kind: ChangeKind::Delete,
            task_id: Some(id),
        });
        Ok(())
    }
}

impl ChangeFeed for MemoryTaskStore {
    fn subscribe_changes(&self, sink: mpsc::UnboundedSender<ChangeEvent>) -> Subscription {
        let mut receiver = self.changes.subscribe();
        Subscription::new(tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if sink.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "change feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }
}
