use std::{future::Future, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use uuid::Uuid;

use crate::{
    dto::orders::OrderWithItems,
    error::AppResult,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Read side used by the tracker: header plus items, scoped to the buyer.
pub trait OrderReader: Send + Sync + 'static {
    fn fetch(
        &self,
        buyer_id: Uuid,
        order_id: Uuid,
    ) -> impl Future<Output = AppResult<Option<OrderWithItems>>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "order", rename_all = "snake_case")]
pub enum TrackedOrder {
    Loading,
    Found(OrderWithItems),
    Missing,
}

/// Keeps one open order view current. Refreshes every `interval`, and early
/// whenever an order-changed event for the order arrives. The refresh task is
/// aborted on `stop` and on drop; `start` replaces any running task.
#[derive(Debug)]
pub struct OrderTracker {
    interval: Duration,
    updates: watch::Sender<TrackedOrder>,
    task: Option<JoinHandle<()>>,
}

impl OrderTracker {
    pub fn new(interval: Duration) -> Self {
        let (updates, _) = watch::channel(TrackedOrder::Loading);
        Self {
            interval,
            updates,
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackedOrder> {
        self.updates.subscribe()
    }

    pub fn current(&self) -> TrackedOrder {
        self.updates.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn start<R: OrderReader>(
        &mut self,
        reader: R,
        buyer_id: Uuid,
        order_id: Uuid,
        events: Option<broadcast::Receiver<Uuid>>,
    ) {
        self.stop();
        let updates = self.updates.clone();
        let interval = self.interval;
        self.task = Some(tokio::spawn(refresh_loop(
            reader, buyer_id, order_id, interval, events, updates,
        )));
        tracing::debug!(%order_id, ?interval, "order tracker started");
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("order tracker stopped");
        }
    }
}

impl Drop for OrderTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn refresh_loop<R: OrderReader>(
    reader: R,
    buyer_id: Uuid,
    order_id: Uuid,
    interval: Duration,
    mut events: Option<broadcast::Receiver<Uuid>>,
    updates: watch::Sender<TrackedOrder>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            event = next_event(&mut events) => match event {
                Ok(changed) if changed == order_id => ticker.reset(),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => ticker.reset(),
                Err(broadcast::error::RecvError::Closed) => {
                    events = None;
                    continue;
                }
            },
        }

        match reader.fetch(buyer_id, order_id).await {
            Ok(Some(snapshot)) => {
                updates.send_if_modified(|current| match current {
                    TrackedOrder::Found(previous) if *previous == snapshot => false,
                    _ => {
                        *current = TrackedOrder::Found(snapshot);
                        true
                    }
                });
            }
            Ok(None) => {
                tracing::info!(%order_id, "tracked order no longer visible");
                updates.send_replace(TrackedOrder::Missing);
                return;
            }
            Err(err) => {
                tracing::warn!(%order_id, error = ?err, "order refresh failed, retrying on next tick");
            }
        }
    }
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<Uuid>>,
) -> Result<Uuid, broadcast::error::RecvError> {
    match events {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
