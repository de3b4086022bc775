/*!
 * Resource Types
 * Allocation results and read-only pool snapshots
 */

use crate::core::types::{ProcessName, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of a non-blocking allocation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// Ownership recorded for the caller
    Granted,
    /// Resource held by `owner`; the caller is now in its wait queue
    Queued { owner: ProcessName },
    /// Resource free but promised to `next`, an earlier waiter; the caller is queued behind it
    Reserved { next: ProcessName },
}

impl Allocation {
    pub fn is_granted(&self) -> bool {
        matches!(self, Allocation::Granted)
    }
}

/// A forced release performed during deadlock resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForcedRelease {
    pub resource: ResourceId,
    pub previous_owner: ProcessName,
}

/// Consistent copy of ownership and wait state taken in one critical section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Owner per resource id
    pub owners: Vec<Option<ProcessName>>,
    /// Resources each blocked process is queued on
    pub waiting: BTreeMap<ProcessName, Vec<ResourceId>>,
    /// Wait queue per resource id, oldest first
    pub queues: Vec<Vec<ProcessName>>,
}

impl ResourceSnapshot {
    /// Build a snapshot from explicit ownership and wait lists
    ///
    /// Queues are derived from the wait lists in name order; used to feed the
    /// detector with synthetic graphs.
    pub fn from_parts(
        owners: Vec<Option<ProcessName>>,
        waiting: BTreeMap<ProcessName, Vec<ResourceId>>,
    ) -> Self {
        let mut queues = vec![Vec::new(); owners.len()];
        for (process, resources) in &waiting {
            for &resource in resources {
                if let Some(queue) = queues.get_mut(resource) {
                    queue.push(process.clone());
                }
            }
        }
        Self {
            owners,
            waiting,
            queues,
        }
    }

    pub fn owner(&self, resource: ResourceId) -> Option<&str> {
        self.owners.get(resource).and_then(|o| o.as_deref())
    }

    /// Currently owned resources with their owners, by id
    pub fn owned(&self) -> Vec<(ResourceId, ProcessName)> {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(id, owner)| owner.clone().map(|o| (id, o)))
            .collect()
    }

    pub fn is_waiting(&self, process: &str) -> bool {
        self.waiting.get(process).is_some_and(|r| !r.is_empty())
    }
}
