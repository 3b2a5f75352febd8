//! Caller-side holder of the one live batch.
//!
//! A session keeps at most one current batch. Starting a new batch replaces
//! it, `reset` discards it, and updates whose batch id is no longer current
//! are dropped on arrival.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::generation::{ApplyError, Artifact, Batch, BatchCounts, BatchId, TaskParam, TaskUpdate};
use crate::metrics::STALE_UPDATES_DROPPED;
use crate::orchestrator::{BatchOrchestrator, BatchRun, OrchestratorError};

/// Event published to session subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new batch became current, every label pending.
    BatchStarted { batch: Batch },
    /// One label of the current batch reached its terminal state.
    TaskUpdated { update: TaskUpdate },
    /// Every label of the current batch is terminal.
    BatchSettled { batch_id: BatchId, counts: BatchCounts },
    /// The current batch was discarded.
    BatchReset { batch_id: Option<BatchId> },
}

/// The live batch of one caller session.
#[derive(Debug)]
pub struct BatchSession {
    current: RwLock<Option<Batch>>,
    /// Highest batch id ever installed; survives `reset`.
    newest: AtomicU64,
    stale_updates: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for BatchSession {
    fn default() -> Self {
        Self::new(256)
    }
}

impl BatchSession {
    /// Create a session whose event channel buffers `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            current: RwLock::new(None),
            newest: AtomicU64::new(0),
            stale_updates: AtomicU64::new(0),
            events,
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Subscribe and read the current batch in one step.
    ///
    /// Events are published while the batch lock is held, so the receiver
    /// yields exactly the changes made after the snapshot: no update is
    /// missed and none repeats a label the snapshot already shows terminal.
    pub async fn subscribe_with_snapshot(
        &self,
    ) -> (broadcast::Receiver<SessionEvent>, Option<Batch>) {
        let current = self.current.read().await;
        (self.events.subscribe(), current.clone())
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Snapshot of the current batch.
    pub async fn current(&self) -> Option<Batch> {
        self.current.read().await.clone()
    }

    pub async fn current_id(&self) -> Option<BatchId> {
        self.current.read().await.as_ref().map(|b| b.id)
    }

    /// Number of updates dropped because their batch was no longer current.
    pub fn stale_updates(&self) -> u64 {
        self.stale_updates.load(Ordering::Relaxed)
    }

    /// Make `batch` current, superseding any previous one.
    ///
    /// Returns false, leaving the session untouched, when a batch with the
    /// same or a newer id was installed before. Its updates then arrive as
    /// stale.
    pub async fn install(&self, batch: Batch) -> bool {
        let mut current = self.current.write().await;
        let newest = self.newest.load(Ordering::Relaxed);
        if batch.id.0 <= newest {
            warn!("Not installing {}: session already saw batch-{}", batch.id, newest);
            return false;
        }
        self.newest.store(batch.id.0, Ordering::Relaxed);

        if let Some(previous) = current.replace(batch.clone()) {
            info!("{} supersedes {}", batch.id, previous.id);
        }
        self.publish(SessionEvent::BatchStarted { batch });
        true
    }

    /// Apply an update if it belongs to the current batch.
    ///
    /// Returns false when the update was dropped.
    pub async fn apply(&self, update: &TaskUpdate) -> bool {
        let mut guard = self.current.write().await;
        let Some(batch) = guard.as_mut() else {
            self.drop_stale(update);
            return false;
        };

        match batch.apply(update) {
            Ok(()) => {}
            Err(ApplyError::WrongBatch { .. }) => {
                self.drop_stale(update);
                return false;
            }
            Err(e) => {
                warn!("Rejected update for {}: {}", update.label, e);
                return false;
            }
        }

        // Still under the lock: snapshot readers see either both or neither
        self.publish(SessionEvent::TaskUpdated {
            update: update.clone(),
        });
        if batch.is_settled() {
            self.publish(SessionEvent::BatchSettled {
                batch_id: batch.id,
                counts: batch.counts(),
            });
        }
        true
    }

    fn drop_stale(&self, update: &TaskUpdate) {
        self.stale_updates.fetch_add(1, Ordering::Relaxed);
        STALE_UPDATES_DROPPED.inc();
        debug!(
            "Dropping late update for {} from {}",
            update.label, update.batch_id
        );
    }

    /// Feed every update of a run into the session until the run settles.
    ///
    /// Keeps draining after a reset so the run's tasks are still joined; their
    /// updates are then dropped as stale.
    pub async fn drive(&self, mut run: BatchRun) -> Batch {
        while let Some(update) = run.next_update().await {
            self.apply(&update).await;
        }
        run.settle().await
    }

    /// Start a batch, make it current and drive it to completion.
    pub async fn run(
        &self,
        orchestrator: &BatchOrchestrator,
        source: Artifact,
        params: Vec<TaskParam>,
    ) -> Result<Batch, OrchestratorError> {
        let run = orchestrator.start_batch(source, params)?;
        if !self.install(run.snapshot().clone()).await {
            warn!("{} lost the start race; its updates will be dropped", run.id());
        }
        Ok(self.drive(run).await)
    }

    /// Discard the current batch. Late updates for it are ignored.
    pub async fn reset(&self) -> Option<BatchId> {
        let mut current = self.current.write().await;
        let previous = current.take().map(|b| b.id);
        if let Some(id) = previous {
            info!("Reset session, discarded {}", id);
        }
        self.publish(SessionEvent::BatchReset { batch_id: previous });
        previous
    }
}
