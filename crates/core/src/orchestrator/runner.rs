//! Batch orchestrator implementation.
//!
//! Fans one batch out into independent generation tasks:
//! - every task is spawned at batch start, none waits on another
//! - each task reports exactly one `TaskUpdate` over a single-consumer channel
//! - the run settles only once every label is terminal

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::generation::{
    Artifact, Batch, BatchId, GenerationError, GenerationService, ItemState, Label, TaskParam,
    TaskUpdate,
};
use crate::metrics::{
    BATCHES_REJECTED, BATCHES_STARTED, BATCH_DURATION, TASKS_IN_FLIGHT, TASKS_TOTAL,
    TASK_DURATION,
};

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, OrchestratorStatus};

/// Callback invoked for each update applied to a batch.
pub type BatchUpdateCallback = Arc<dyn Fn(&TaskUpdate) + Send + Sync>;

/// Reason recorded for a task that ended without reporting (e.g. it panicked).
const LOST_TASK_REASON: &str = "generation task ended without reporting an outcome";

/// The batch orchestrator - runs one generation task per label.
pub struct BatchOrchestrator {
    config: OrchestratorConfig,
    service: Arc<dyn GenerationService>,
    update_callback: Option<BatchUpdateCallback>,

    // Runtime state
    last_batch_id: AtomicU64,
    tasks_in_flight: Arc<AtomicUsize>,
}

impl BatchOrchestrator {
    /// Create a new orchestrator.
    pub fn new(config: OrchestratorConfig, service: Arc<dyn GenerationService>) -> Self {
        Self {
            config,
            service,
            update_callback: None,
            last_batch_id: AtomicU64::new(0),
            tasks_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set a callback that observes every applied update.
    pub fn with_update_callback(mut self, callback: BatchUpdateCallback) -> Self {
        self.update_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            service: self.service.name().to_string(),
            batches_started: self.last_batch_id.load(Ordering::Relaxed),
            tasks_in_flight: self.tasks_in_flight.load(Ordering::Relaxed),
        }
    }

    /// Validate input and spawn every task of a new batch.
    ///
    /// Must be called from within a tokio runtime. Returns before any task has
    /// finished; use [`BatchRun::next_update`] or [`BatchRun::settle`] to
    /// observe completion.
    pub fn start_batch(
        &self,
        source: Artifact,
        params: Vec<TaskParam>,
    ) -> Result<BatchRun, OrchestratorError> {
        if let Err(e) = validate_input(&source, &params) {
            BATCHES_REJECTED.with_label_values(&[e.reason()]).inc();
            warn!("Rejected batch request: {}", e);
            return Err(e);
        }

        let batch_id = BatchId(self.last_batch_id.fetch_add(1, Ordering::SeqCst) + 1);
        let batch = Batch::new(batch_id, &params);
        BATCHES_STARTED.inc();
        info!(
            "Starting {} with {} tasks via {}",
            batch_id,
            params.len(),
            self.service.name()
        );

        // One slot per task so no task ever blocks on send
        let (tx, rx) = mpsc::channel(params.len());
        let source = Arc::new(source);
        let timeout = self.config.task_timeout();

        for param in params {
            let tx = tx.clone();
            let service = Arc::clone(&self.service);
            let source = Arc::clone(&source);
            let guard = InFlightGuard::new(Arc::clone(&self.tasks_in_flight));

            tokio::spawn(async move {
                let update = run_task(service.as_ref(), &source, param, batch_id, timeout).await;
                drop(guard);
                if tx.send(update).await.is_err() {
                    debug!("{} was dropped before its task landed", batch_id);
                }
            });
        }

        Ok(BatchRun {
            batch,
            rx,
            callback: self.update_callback.clone(),
            started: Instant::now(),
        })
    }

    /// Run a whole batch and return it once every label is terminal.
    ///
    /// Individual task failures are recorded per label; only input-contract
    /// violations make this return an error.
    pub async fn run_batch(
        &self,
        source: Artifact,
        params: Vec<TaskParam>,
    ) -> Result<Batch, OrchestratorError> {
        let run = self.start_batch(source, params)?;
        Ok(run.settle().await)
    }
}

/// A started batch whose tasks are in flight.
///
/// Owns the batch exclusively; updates are applied in arrival order.
pub struct BatchRun {
    batch: Batch,
    rx: mpsc::Receiver<TaskUpdate>,
    callback: Option<BatchUpdateCallback>,
    started: Instant,
}

impl BatchRun {
    pub fn id(&self) -> BatchId {
        self.batch.id
    }

    /// Current state of the batch.
    pub fn snapshot(&self) -> &Batch {
        &self.batch
    }

    /// Wait for the next task to land and apply it.
    ///
    /// Yields each label exactly once, in completion order, and `None` once
    /// the batch is settled.
    pub async fn next_update(&mut self) -> Option<TaskUpdate> {
        while !self.batch.is_settled() {
            let update = match self.rx.recv().await {
                Some(update) => update,
                None => {
                    // Every sender is gone; whatever is still pending was lost.
                    let label = self.batch.pending_labels().into_iter().next()?;
                    warn!("{}: task for {} ended without an outcome", self.batch.id, label);
                    TaskUpdate::error(self.batch.id, label, LOST_TASK_REASON)
                }
            };

            match self.batch.apply(&update) {
                Ok(()) => {
                    if let Some(ref callback) = self.callback {
                        callback(&update);
                    }
                    return Some(update);
                }
                Err(e) => warn!("{}: ignoring update: {}", self.batch.id, e),
            }
        }
        None
    }

    /// Join barrier: wait for every task, then return the terminal batch.
    pub async fn settle(mut self) -> Batch {
        while self.next_update().await.is_some() {}

        let elapsed = self.started.elapsed();
        BATCH_DURATION.observe(elapsed.as_secs_f64());
        let counts = self.batch.counts();
        info!(
            "{} settled in {:?}: {} done, {} failed",
            self.batch.id, elapsed, counts.done, counts.error
        );
        self.batch
    }
}

/// Run one generation call and turn its outcome into an update.
async fn run_task(
    service: &dyn GenerationService,
    source: &Artifact,
    param: TaskParam,
    batch_id: BatchId,
    timeout: Option<Duration>,
) -> TaskUpdate {
    let started = Instant::now();
    debug!("{}: generating {}", batch_id, param.label);

    let call = service.generate(source, &param.directive);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(GenerationError::Timeout(limit))),
        None => call.await,
    };

    let update = match result {
        Ok(artifact) => {
            debug!("{}: {} done in {:?}", batch_id, param.label, started.elapsed());
            TaskUpdate::done(batch_id, param.label, artifact)
        }
        Err(e) => {
            warn!("{}: {} failed: {}", batch_id, param.label, e);
            TaskUpdate::error(batch_id, param.label, e.to_string())
        }
    };

    let result_label = match update.state {
        ItemState::Done { .. } => "done",
        _ => "error",
    };
    TASKS_TOTAL.with_label_values(&[result_label]).inc();
    TASK_DURATION
        .with_label_values(&[service.name(), result_label])
        .observe(started.elapsed().as_secs_f64());

    update
}

fn validate_input(source: &Artifact, params: &[TaskParam]) -> Result<(), OrchestratorError> {
    if source.is_empty() {
        return Err(OrchestratorError::EmptySource);
    }
    if params.is_empty() {
        return Err(OrchestratorError::NoTasks);
    }

    let mut seen: HashSet<&Label> = HashSet::with_capacity(params.len());
    for (index, param) in params.iter().enumerate() {
        if param.label.is_empty() {
            return Err(OrchestratorError::EmptyLabel { index });
        }
        if !seen.insert(&param.label) {
            return Err(OrchestratorError::DuplicateLabel(param.label.clone()));
        }
    }
    Ok(())
}

/// Counts a task as in flight until its generation call has returned.
struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl InFlightGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        TASKS_IN_FLIGHT.inc();
        Self { counter }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
        TASKS_IN_FLIGHT.dec();
    }
}
