//! Data model shared by the orchestrator and the interpolator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Positional label of a task within a batch (e.g. "+20 years").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Free-form instruction handed to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directive(String);

impl Directive {
    pub fn new(directive: impl Into<String>) -> Self {
        Self(directive.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to an image: a `data:` URL or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(String);

impl Artifact {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Build a `data:` URL artifact from a MIME type and base64 payload.
    pub fn from_base64(mime_type: &str, data: &str) -> Self {
        Self(format!("data:{};base64,{}", mime_type, data))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Split a `data:<mime>;base64,<payload>` reference into its parts.
    ///
    /// Returns `None` for remote URLs or any other encoding.
    pub fn as_inline_data(&self) -> Option<(&str, &str)> {
        let rest = self.0.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let mime_type = meta.strip_suffix(";base64")?;
        if mime_type.is_empty() || payload.is_empty() {
            return None;
        }
        Some((mime_type, payload))
    }
}

/// One (label, directive) pair of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskParam {
    pub label: Label,
    pub directive: Directive,
}

impl TaskParam {
    pub fn new(label: impl Into<Label>, directive: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            directive: Directive::new(directive),
        }
    }
}

/// Lifecycle status of a generated item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Done,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single generation task.
///
/// The artifact exists only in `Done`, the failure reason only in `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Done { artifact: Artifact },
    Error { reason: String },
}

impl ItemState {
    pub fn status(&self) -> ItemStatus {
        match self {
            Self::Pending => ItemStatus::Pending,
            Self::Done { .. } => ItemStatus::Done,
            Self::Error { .. } => ItemStatus::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

/// The unit the orchestrator owns per label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub label: Label,
    #[serde(flatten)]
    pub state: ItemState,
    /// When the item reached its terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl GeneratedItem {
    pub fn pending(label: Label) -> Self {
        Self {
            label,
            state: ItemState::Pending,
            settled_at: None,
        }
    }

    pub fn status(&self) -> ItemStatus {
        self.state.status()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.state {
            ItemState::Done { artifact } => Some(artifact),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            ItemState::Error { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Version counter identifying one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// Outcome of one task, addressed to the batch and label it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub batch_id: BatchId,
    pub label: Label,
    pub state: ItemState,
    pub completed_at: DateTime<Utc>,
}

impl TaskUpdate {
    pub fn done(batch_id: BatchId, label: Label, artifact: Artifact) -> Self {
        Self {
            batch_id,
            label,
            state: ItemState::Done { artifact },
            completed_at: Utc::now(),
        }
    }

    pub fn error(batch_id: BatchId, label: Label, reason: impl Into<String>) -> Self {
        Self {
            batch_id,
            label,
            state: ItemState::Error {
                reason: reason.into(),
            },
            completed_at: Utc::now(),
        }
    }
}

/// Why a batch refused an update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("update belongs to {got}, batch is {expected}")]
    WrongBatch { expected: BatchId, got: BatchId },

    #[error("unknown label: {0}")]
    UnknownLabel(Label),

    #[error("label {0} is already terminal")]
    AlreadyTerminal(Label),

    #[error("update for {0} is not terminal")]
    NotTerminal(Label),
}

/// Per-status item counts of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub pending: usize,
    pub done: usize,
    pub error: usize,
}

/// Ordered label -> item mapping for one run.
///
/// Entries keep the order of the task parameters the batch was created from,
/// never completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub started_at: DateTime<Utc>,
    pub items: Vec<GeneratedItem>,
}

impl Batch {
    /// Create a batch with every label pending.
    pub fn new(id: BatchId, params: &[TaskParam]) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            items: params
                .iter()
                .map(|p| GeneratedItem::pending(p.label.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, label: &Label) -> Option<&GeneratedItem> {
        self.items.iter().find(|item| &item.label == label)
    }

    pub fn status(&self, label: &Label) -> Option<ItemStatus> {
        self.get(label).map(GeneratedItem::status)
    }

    pub fn artifact(&self, label: &Label) -> Option<&Artifact> {
        self.get(label).and_then(GeneratedItem::artifact)
    }

    pub fn failure_reason(&self, label: &Label) -> Option<&str> {
        self.get(label).and_then(GeneratedItem::failure_reason)
    }

    /// Apply a terminal update to its own label.
    ///
    /// Each label transitions exactly once; anything else is rejected and the
    /// batch is left untouched.
    pub fn apply(&mut self, update: &TaskUpdate) -> Result<(), ApplyError> {
        if update.batch_id != self.id {
            return Err(ApplyError::WrongBatch {
                expected: self.id,
                got: update.batch_id,
            });
        }
        if !update.state.is_terminal() {
            return Err(ApplyError::NotTerminal(update.label.clone()));
        }

        let item = self
            .items
            .iter_mut()
            .find(|item| item.label == update.label)
            .ok_or_else(|| ApplyError::UnknownLabel(update.label.clone()))?;

        if item.state.is_terminal() {
            return Err(ApplyError::AlreadyTerminal(update.label.clone()));
        }

        item.state = update.state.clone();
        item.settled_at = Some(update.completed_at);
        Ok(())
    }

    /// True once every item is `done` or `error`.
    pub fn is_settled(&self) -> bool {
        self.items.iter().all(|item| item.state.is_terminal())
    }

    /// Labels still waiting on their task.
    pub fn pending_labels(&self) -> Vec<Label> {
        self.items
            .iter()
            .filter(|item| !item.state.is_terminal())
            .map(|item| item.label.clone())
            .collect()
    }

    /// Successful items in original label order.
    pub fn successful(&self) -> Vec<&GeneratedItem> {
        self.items
            .iter()
            .filter(|item| item.status() == ItemStatus::Done)
            .collect()
    }

    pub fn counts(&self) -> BatchCounts {
        self.items
            .iter()
            .fold(BatchCounts::default(), |mut counts, item| {
                match item.status() {
                    ItemStatus::Pending => counts.pending += 1,
                    ItemStatus::Done => counts.done += 1,
                    ItemStatus::Error => counts.error += 1,
                }
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(labels: &[&str]) -> Vec<TaskParam> {
        labels
            .iter()
            .map(|l| TaskParam::new(*l, format!("shift {}", l)))
            .collect()
    }

    #[test]
    fn test_new_batch_is_all_pending() {
        let batch = Batch::new(BatchId(1), &params(&["a", "b", "c"]));
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_settled());
        for label in ["a", "b", "c"] {
            let label = Label::from(label);
            assert_eq!(batch.status(&label), Some(ItemStatus::Pending));
            assert!(batch.artifact(&label).is_none());
            assert!(batch.failure_reason(&label).is_none());
        }
    }

    #[test]
    fn test_apply_done_and_error() {
        let mut batch = Batch::new(BatchId(7), &params(&["a", "b"]));

        batch
            .apply(&TaskUpdate::done(
                BatchId(7),
                "a".into(),
                Artifact::new("https://img/a.png"),
            ))
            .unwrap();
        batch
            .apply(&TaskUpdate::error(BatchId(7), "b".into(), "service unavailable"))
            .unwrap();

        let a = Label::from("a");
        let b = Label::from("b");
        assert_eq!(batch.status(&a), Some(ItemStatus::Done));
        assert_eq!(batch.artifact(&a).unwrap().as_str(), "https://img/a.png");
        assert!(batch.failure_reason(&a).is_none());
        assert_eq!(batch.status(&b), Some(ItemStatus::Error));
        assert_eq!(batch.failure_reason(&b), Some("service unavailable"));
        assert!(batch.artifact(&b).is_none());
        assert!(batch.is_settled());
        assert!(batch.get(&a).unwrap().settled_at.is_some());
    }

    #[test]
    fn test_apply_rejects_second_terminal_update() {
        let mut batch = Batch::new(BatchId(1), &params(&["a"]));
        batch
            .apply(&TaskUpdate::done(BatchId(1), "a".into(), Artifact::new("x")))
            .unwrap();

        let err = batch
            .apply(&TaskUpdate::error(BatchId(1), "a".into(), "late"))
            .unwrap_err();
        assert_eq!(err, ApplyError::AlreadyTerminal("a".into()));
        assert_eq!(batch.status(&"a".into()), Some(ItemStatus::Done));
    }

    #[test]
    fn test_apply_rejects_foreign_batch_and_unknown_label() {
        let mut batch = Batch::new(BatchId(2), &params(&["a"]));

        let err = batch
            .apply(&TaskUpdate::done(BatchId(1), "a".into(), Artifact::new("x")))
            .unwrap_err();
        assert!(matches!(err, ApplyError::WrongBatch { .. }));

        let err = batch
            .apply(&TaskUpdate::done(BatchId(2), "zz".into(), Artifact::new("x")))
            .unwrap_err();
        assert_eq!(err, ApplyError::UnknownLabel("zz".into()));
        assert!(!batch.is_settled());
    }

    #[test]
    fn test_apply_rejects_pending_update() {
        let mut batch = Batch::new(BatchId(1), &params(&["a"]));
        let update = TaskUpdate {
            batch_id: BatchId(1),
            label: "a".into(),
            state: ItemState::Pending,
            completed_at: Utc::now(),
        };
        assert_eq!(batch.apply(&update), Err(ApplyError::NotTerminal("a".into())));
    }

    #[test]
    fn test_successful_keeps_label_order() {
        let mut batch = Batch::new(BatchId(1), &params(&["a", "b", "c", "d"]));
        // Completion order d, a, c, then b fails
        batch
            .apply(&TaskUpdate::done(BatchId(1), "d".into(), Artifact::new("d")))
            .unwrap();
        batch
            .apply(&TaskUpdate::done(BatchId(1), "a".into(), Artifact::new("a")))
            .unwrap();
        batch
            .apply(&TaskUpdate::done(BatchId(1), "c".into(), Artifact::new("c")))
            .unwrap();
        batch
            .apply(&TaskUpdate::error(BatchId(1), "b".into(), "boom"))
            .unwrap();

        let labels: Vec<&str> = batch
            .successful()
            .iter()
            .map(|item| item.label.as_str())
            .collect();
        assert_eq!(labels, vec!["a", "c", "d"]);
        assert_eq!(
            batch.counts(),
            BatchCounts {
                pending: 0,
                done: 3,
                error: 1
            }
        );
    }

    #[test]
    fn test_artifact_inline_data() {
        let artifact = Artifact::from_base64("image/png", "iVBORw0KGgo=");
        assert_eq!(artifact.as_str(), "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(
            artifact.as_inline_data(),
            Some(("image/png", "iVBORw0KGgo="))
        );

        assert!(Artifact::new("https://example.com/a.png")
            .as_inline_data()
            .is_none());
        assert!(Artifact::new("data:image/png,raw").as_inline_data().is_none());
        assert!(Artifact::new("data:;base64,abc").as_inline_data().is_none());
    }

    #[test]
    fn test_item_serialization() {
        let item = GeneratedItem {
            label: "+10 years".into(),
            state: ItemState::Error {
                reason: "timeout".to_string(),
            },
            settled_at: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["label"], "+10 years");
        assert_eq!(json["status"], "error");
        assert_eq!(json["reason"], "timeout");

        let parsed: GeneratedItem = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, item);
    }
}
