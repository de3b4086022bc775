/*!
 * Resource Manager
 * Fixed pool of exclusive resources with FIFO wait queues
 *
 * Ownership and wait queues live behind a single mutex so an allocation
 * attempt checks ownership and registers the waiter in one critical section,
 * and a snapshot never sees a half-applied release.
 */

use super::types::{Allocation, ForcedRelease, ResourceSnapshot};
use crate::core::errors::ResourceError;
use crate::core::types::{ProcessName, ResourceId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Pool {
    owners: Vec<Option<ProcessName>>,
    queues: Vec<VecDeque<ProcessName>>,
    forced: Vec<ForcedRelease>,
}

impl Pool {
    fn new(size: usize) -> Self {
        Self {
            owners: vec![None; size],
            queues: vec![VecDeque::new(); size],
            forced: Vec::new(),
        }
    }

    fn dequeue(&mut self, resource: ResourceId, process: &str) {
        self.queues[resource].retain(|p| p != process);
    }
}

/// Exclusive resource manager
#[derive(Debug, Clone)]
pub struct ResourceManager {
    pool: Arc<Mutex<Pool>>,
    size: usize,
}

impl ResourceManager {
    pub fn new(size: usize) -> Self {
        info!(pool_size = size, "Resource manager initialized");
        Self {
            pool: Arc::new(Mutex::new(Pool::new(size))),
            size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.size
    }

    fn check(&self, resource: ResourceId) -> Result<(), ResourceError> {
        if resource < self.size {
            Ok(())
        } else {
            Err(ResourceError::OutOfRange {
                resource,
                pool_size: self.size,
            })
        }
    }

    /// Non-blocking allocation
    ///
    /// Grants the resource if it is free and nobody queued earlier, otherwise
    /// appends `process` to the resource's wait queue (once). A free resource
    /// with a non-empty queue goes to the queue head only. Resources are not
    /// reentrant: a process asking for a resource it already holds queues
    /// behind itself.
    pub fn try_allocate(
        &self,
        resource: ResourceId,
        process: &str,
    ) -> Result<Allocation, ResourceError> {
        self.check(resource)?;
        let mut pool = self.pool.lock();

        let head = pool.queues[resource].front().cloned();
        let outcome = match (pool.owners[resource].clone(), head) {
            (None, None) => None,
            (None, Some(next)) if next == process => None,
            (None, Some(next)) => Some(Allocation::Reserved { next }),
            (Some(owner), _) => Some(Allocation::Queued { owner }),
        };

        let Some(outcome) = outcome else {
            pool.owners[resource] = Some(process.to_string());
            pool.dequeue(resource, process);
            debug!(resource, process, "Resource granted");
            return Ok(Allocation::Granted);
        };

        if !pool.queues[resource].iter().any(|p| p == process) {
            pool.queues[resource].push_back(process.to_string());
        }
        debug!(resource, process, outcome = ?outcome, "Resource unavailable, caller queued");
        Ok(outcome)
    }

    /// Clear ownership; releasing a free resource is a no-op
    pub fn release(&self, resource: ResourceId) -> Result<Option<ProcessName>, ResourceError> {
        self.check(resource)?;
        let previous = self.pool.lock().owners[resource].take();
        if let Some(ref owner) = previous {
            debug!(resource, owner = %owner, "Resource released");
        }
        Ok(previous)
    }

    /// Release everything `process` owns and drop it from every wait queue
    ///
    /// Returns the released resource ids in ascending order.
    pub fn release_all(&self, process: &str) -> Vec<ResourceId> {
        let mut pool = self.pool.lock();
        let mut released = Vec::new();

        for (id, owner) in pool.owners.iter_mut().enumerate() {
            if owner.as_deref() == Some(process) {
                *owner = None;
                released.push(id);
            }
        }
        for queue in pool.queues.iter_mut() {
            queue.retain(|p| p != process);
        }

        if !released.is_empty() {
            debug!(process, resources = ?released, "Released all resources");
        }
        released
    }

    /// Revoke a resource from whoever holds it
    ///
    /// Records the (resource, previous owner) pair. Returns `None` when the
    /// resource was already free.
    pub fn force_release(
        &self,
        resource: ResourceId,
    ) -> Result<Option<ForcedRelease>, ResourceError> {
        self.check(resource)?;
        let mut pool = self.pool.lock();

        let Some(owner) = pool.owners[resource].take() else {
            return Ok(None);
        };
        let record = ForcedRelease {
            resource,
            previous_owner: owner,
        };
        pool.forced.push(record.clone());
        warn!(resource, owner = %record.previous_owner, "Resource force released");
        Ok(Some(record))
    }

    /// Remove `process` from a resource's wait queue without granting anything
    pub fn withdraw(&self, resource: ResourceId, process: &str) {
        if resource < self.size {
            self.pool.lock().dequeue(resource, process);
        }
    }

    pub fn owner(&self, resource: ResourceId) -> Option<ProcessName> {
        self.pool.lock().owners.get(resource).cloned().flatten()
    }

    /// Resources currently held by `process`, ascending
    pub fn owned_by(&self, process: &str) -> Vec<ResourceId> {
        self.pool
            .lock()
            .owners
            .iter()
            .enumerate()
            .filter(|(_, owner)| owner.as_deref() == Some(process))
            .map(|(id, _)| id)
            .collect()
    }

    /// Wait queue of one resource, oldest first
    pub fn waiters(&self, resource: ResourceId) -> Vec<ProcessName> {
        self.pool
            .lock()
            .queues
            .get(resource)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every forced release performed so far, in order
    pub fn forced_releases(&self) -> Vec<ForcedRelease> {
        self.pool.lock().forced.clone()
    }

    /// Consistent read-only copy of ownership and wait state
    pub fn snapshot(&self) -> ResourceSnapshot {
        let pool = self.pool.lock();

        let mut waiting: BTreeMap<ProcessName, Vec<ResourceId>> = BTreeMap::new();
        for (id, queue) in pool.queues.iter().enumerate() {
            for process in queue {
                waiting.entry(process.clone()).or_default().push(id);
            }
        }

        ResourceSnapshot {
            owners: pool.owners.clone(),
            waiting,
            queues: pool.queues.iter().map(|q| q.iter().cloned().collect()).collect(),
        }
    }
}
