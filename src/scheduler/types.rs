/*!
 * Scheduler Types
 * Policy selector, run outcome and the report handed to presentation
 */

use crate::core::errors::ConfigError;
use crate::core::types::{ProcessName, ResourceId, Tick};
use crate::monitoring::ActionEntry;
use crate::process::ProcessRecord;
use crate::resources::ForcedRelease;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Scheduling policy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// First-come-first-served, load order
    Fcfs,
    /// Shortest job first by static burst estimate
    SjfNonPreemptive,
    /// Shortest remaining time first, re-evaluated per instruction
    SjfPreemptive,
    /// Fixed quantum, FIFO ready queue
    RoundRobin,
}

impl Policy {
    pub const ALL: [Policy; 4] = [
        Policy::Fcfs,
        Policy::SjfNonPreemptive,
        Policy::SjfPreemptive,
        Policy::RoundRobin,
    ];

    /// Canonical name used in configuration and serialization
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fcfs => "fcfs",
            Self::SjfNonPreemptive => "sjf-nonpreemptive",
            Self::SjfPreemptive => "sjf-preemptive",
            Self::RoundRobin => "round-robin",
        }
    }

    /// Short tag attached to action log notes
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Fcfs => "[FCFS]",
            Self::SjfNonPreemptive => "[SJF]",
            Self::SjfPreemptive => "[SRTF]",
            Self::RoundRobin => "[RR]",
        }
    }

    pub const fn is_preemptive(&self) -> bool {
        matches!(self, Self::SjfPreemptive | Self::RoundRobin)
    }
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fcfs" | "fifo" => Ok(Self::Fcfs),
            "sjf" | "sjf-nonpreemptive" | "sjf-np" => Ok(Self::SjfNonPreemptive),
            "srtf" | "sjf-preemptive" | "sjf-p" => Ok(Self::SjfPreemptive),
            "rr" | "round-robin" | "roundrobin" => Ok(Self::RoundRobin),
            _ => Err(ConfigError::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Policy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every process reached FINISHED
    Completed,
    /// Stopped by an external halt; the tables are partial
    Halted,
}

/// Everything presentation needs after a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub policy: Policy,
    pub outcome: RunOutcome,
    /// Logical time at which the run ended
    pub elapsed: Tick,
    /// One row per process, finished processes in completion order first
    pub processes: Vec<ProcessRecord>,
    pub actions: Vec<ActionEntry>,
    pub forced_releases: Vec<ForcedRelease>,
    /// Owner of each resource when the run ended
    pub final_ownership: Vec<Option<ProcessName>>,
}

impl SimulationReport {
    /// Names of processes that reached FINISHED, sorted
    pub fn completed(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .processes
            .iter()
            .filter(|p| p.finish.is_some())
            .map(|p| p.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn process(&self, name: &str) -> Option<&ProcessRecord> {
        self.processes.iter().find(|p| p.name == name)
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// Resources still held when the run ended
    pub fn held_resources(&self) -> Vec<ResourceId> {
        self.final_ownership
            .iter()
            .enumerate()
            .filter_map(|(id, owner)| owner.as_ref().map(|_| id))
            .collect()
    }
}
