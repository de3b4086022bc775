/*!
 * Process Types
 * Execution states and the process table row handed to presentation
 */

use crate::core::types::{ProcessName, Tick};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Waiting for dispatch
    Ready,
    /// Dispatched; also covers a process suspended inside a `Wait`
    Running,
    /// Waiting on a resource another process holds
    Blocked,
    /// Terminal
    Finished,
}

impl ProcessState {
    /// Legal edges of the state machine
    pub const fn can_transition_to(self, to: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, to),
            (Ready, Running) | (Running, Blocked) | (Running, Finished) | (Running, Ready) | (Blocked, Ready)
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Blocked => "BLOCKED",
            Self::Finished => "FINISHED",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the process completion table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub name: ProcessName,
    pub state: ProcessState,
    pub start: Option<Tick>,
    pub finish: Option<Tick>,
    /// finish - start, present only for finished processes
    pub turnaround: Option<Tick>,
    pub estimated_burst: u64,
}
