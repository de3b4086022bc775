/*!
 * Action Log
 * Append-only record of simulation events, read by presentation
 */

use crate::core::types::{ProcessName, ResourceId, Tick, SYSTEM_ACTOR};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

/// Kind of recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Started,
    Requested,
    Allocated,
    Blocked,
    AcquiredAfterWait,
    AcquiredAfterRelease,
    Waited,
    Requeued,
    Ended,
    Released,
    DeadlockDetected,
    ForceReleased,
    ResolutionRejected,
    Halted,
}

impl ActionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started execution",
            Self::Requested => "requests resource",
            Self::Allocated => "allocated resource",
            Self::Blocked => "blocked on resource",
            Self::AcquiredAfterWait => "acquired after wait",
            Self::AcquiredAfterRelease => "acquired after release",
            Self::Waited => "waits",
            Self::Requeued => "re-queued",
            Self::Ended => "ends and releases all resources",
            Self::Released => "released resource",
            Self::DeadlockDetected => "deadlock detected",
            Self::ForceReleased => "force released resource",
            Self::ResolutionRejected => "resolution rejected",
            Self::Halted => "halted",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Logical time of the action
    pub tick: Tick,
    /// Wall-clock time the entry was recorded (UTC)
    pub wall: OffsetDateTime,
    pub process: ProcessName,
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ActionEntry {
    pub fn is_system(&self) -> bool {
        self.process == SYSTEM_ACTOR
    }
}

/// Shared append-only action log
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    entries: Arc<RwLock<Vec<ActionEntry>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn record(
        &self,
        tick: Tick,
        process: &str,
        kind: ActionKind,
        resource: Option<ResourceId>,
        note: Option<String>,
    ) {
        debug!(tick, process, action = %kind, resource = ?resource, note = ?note, "action");
        self.entries.write().push(ActionEntry {
            tick,
            wall: OffsetDateTime::now_utc(),
            process: process.to_string(),
            kind,
            resource,
            note,
        });
    }

    /// Append an entry attributed to the simulator itself
    pub fn system(&self, tick: Tick, kind: ActionKind, resource: Option<ResourceId>, note: String) {
        self.record(tick, SYSTEM_ACTOR, kind, resource, Some(note));
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of every entry in recording order
    pub fn entries(&self) -> Vec<ActionEntry> {
        self.entries.read().clone()
    }

    /// Entries of one kind, in recording order
    pub fn of_kind(&self, kind: ActionKind) -> Vec<ActionEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Entries for one process, in recording order
    pub fn for_process(&self, process: &str) -> Vec<ActionEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.process == process)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_order_is_preserved() {
        let log = ActionLog::new();
        log.record(0, "P1", ActionKind::Started, None, None);
        log.record(0, "P1", ActionKind::Requested, Some(2), None);
        log.system(1, ActionKind::DeadlockDetected, None, "involving P1".into());

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].resource, Some(2));
        assert!(entries[2].is_system());
        assert_eq!(log.of_kind(ActionKind::Requested).len(), 1);
        assert_eq!(log.for_process("P1").len(), 2);
    }

    #[test]
    fn test_clones_share_storage() {
        let log = ActionLog::new();
        let other = log.clone();
        other.record(4, "P2", ActionKind::Ended, None, None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ActionKind::Ended.to_string(), "ends and releases all resources");
        assert_eq!(ActionKind::AcquiredAfterWait.as_str(), "acquired after wait");
    }
}
