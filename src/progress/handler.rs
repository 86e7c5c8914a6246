//! Progress events and the handler trait the pipeline publishes through

use crate::pipeline::SessionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// What happened at the moment the event was published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    StageStarted,
    StageRetrying,
    StageCompleted,
    StageDegraded,
    StageFailed,
    SessionCompleted,
    SessionFailed,
    SessionCancelled,
}

impl ProgressKind {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressKind::SessionCompleted
                | ProgressKind::SessionFailed
                | ProgressKind::SessionCancelled
        )
    }
}

/// One entry of a session's append-only progress stream
///
/// Serializes as `{"type":"analysis_progress", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "analysis_progress")]
pub struct ProgressEvent {
    pub session_id: Uuid,
    pub stage: SessionStatus,
    pub kind: ProgressKind,
    pub progress_percent: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Delivery is at-least-once; consumers deduplicate on this key
    pub fn idempotency_key(&self) -> (Uuid, SessionStatus, u8) {
        (self.session_id, self.stage, self.progress_percent)
    }
}

/// Trait for handling progress events published by the pipeline
pub trait ProgressHandler: Send + Sync {
    /// Called synchronously, in publication order, for every event
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Keeps every event in memory, for polling consumers and tests
#[derive(Debug, Default)]
pub struct ProgressRecorder {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that panicked while holding the lock leaves the events intact
    fn lock(&self) -> MutexGuard<'_, Vec<ProgressEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.lock().clone()
    }

    pub fn events_for(&self, session_id: Uuid) -> Vec<ProgressEvent> {
        self.lock()
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressHandler for ProgressRecorder {
    fn on_progress(&self, event: &ProgressEvent) {
        self.lock().push(event.clone());
    }
}
