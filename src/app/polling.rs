//! Background refresh triggers: debounced change notifications plus an
//! optional periodic poll.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::store::{ChangeEvent, ChangeFeed, Subscription};

/// Collapses bursts of refresh requests into a single call of `on_fire`,
/// made once `delay` has passed without a new request.
#[derive(Debug)]
pub struct RefreshDebouncer {
    trigger: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl RefreshDebouncer {
    pub fn spawn(delay: Duration, mut on_fire: impl FnMut() + Send + 'static) -> Self {
        let (trigger, mut requests) = mpsc::unbounded_channel::<()>();
        let task = tokio::spawn(async move {
            while requests.recv().await.is_some() {
                loop {
                    tokio::select! {
                        next = requests.recv() => {
                            if next.is_none() {
                                on_fire();
                                return;
                            }
                        }
                        () = tokio::time::sleep(delay) => break,
                    }
                }
                on_fire();
            }
        });
        Self { trigger, task }
    }

    pub fn notify(&self) {
        let _ = self.trigger.send(());
    }

    pub fn trigger(&self) -> mpsc::UnboundedSender<()> {
        self.trigger.clone()
    }
}

impl Drop for RefreshDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Sends a refresh request every `interval`, skipping the immediate first tick.
pub fn spawn_periodic_refresh(
    interval: Duration,
    trigger: mpsc::UnboundedSender<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            debug!(?interval, "periodic refresh");
            if trigger.send(()).is_err() {
                break;
            }
        }
    })
}

fn spawn_change_forwarder(
    mut changes: mpsc::UnboundedReceiver<ChangeEvent>,
    trigger: mpsc::UnboundedSender<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = changes.recv().await {
            debug!(kind = ?event.kind, task_id = ?event.task_id, "task change received");
            if trigger.send(()).is_err() {
                break;
            }
        }
    })
}

/// Everything that keeps the board in sync in the background. Dropping it
/// stops the debouncer, the poller and the change subscription; requests
/// already in flight are left to finish.
#[derive(Debug)]
pub struct RefreshPipeline {
    debouncer: RefreshDebouncer,
    poller: Option<JoinHandle<()>>,
    forwarder: Option<JoinHandle<()>>,
    subscription: Option<Subscription>,
}

impl RefreshPipeline {
    pub fn start(
        debounce: Duration,
        poll_interval: Option<Duration>,
        feed: Option<Arc<dyn ChangeFeed>>,
        on_fire: impl FnMut() + Send + 'static,
    ) -> Self {
        let debouncer = RefreshDebouncer::spawn(debounce, on_fire);
        let poller = poll_interval.map(|interval| spawn_periodic_refresh(interval, debouncer.trigger()));
        let (forwarder, subscription) = match feed {
            Some(feed) => {
                let (sink, changes) = mpsc::unbounded_channel();
                let subscription = feed.subscribe_changes(sink);
                (
                    Some(spawn_change_forwarder(changes, debouncer.trigger())),
                    Some(subscription),
                )
            }
            None => (None, None),
        };
        Self {
            debouncer,
            poller,
            forwarder,
            subscription,
        }
    }

    pub fn request_refresh(&self) {
        self.debouncer.notify();
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }
}

impl Drop for RefreshPipeline {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}
