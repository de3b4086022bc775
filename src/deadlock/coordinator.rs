/*!
 * Resolution Coordinator
 * Detect, ask the operator, force-release, and let the freed resources flow
 *
 * A forced release can free more than one resource: the waiter that receives
 * it may be sitting on its `End`, and terminating it releases everything it
 * holds. Freed resources are therefore processed from a worklist until no
 * further grant is possible.
 */

use super::detector::{find_cycle, Cycle};
use super::resolver::{DeadlockResolver, ResolutionRequest};
use crate::core::clock::HaltSignal;
use crate::core::errors::{ResolutionError, SchedulerError};
use crate::core::types::{ProcessName, ResourceId};
use crate::monitoring::ActionKind;
use crate::process::{ExecContext, ProcessSet};
use crate::resources::{ForcedRelease, ResourceSnapshot};
use std::collections::VecDeque;
use tracing::{info, warn};

/// Result of one coordinator pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The wait-for graph has no cycle; blocked processes are only waiting
    NoDeadlock,
    /// A resource was revoked and handed on
    Resolved {
        released: ForcedRelease,
        /// Processes moved BLOCKED -> READY, in grant order
        unblocked: Vec<ProcessName>,
        /// Processes that terminated as part of the hand-off
        finished: Vec<ProcessName>,
    },
    /// The operator declined to pick, or a halt arrived while prompting
    Abandoned,
}

/// Drives deadlock resolution for one run
pub struct Coordinator {
    resolver: Box<dyn DeadlockResolver>,
    /// Only resources on the detected cycle may be chosen
    cycle_only: bool,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("cycle_only", &self.cycle_only)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(resolver: Box<dyn DeadlockResolver>, cycle_only: bool) -> Self {
        Self {
            resolver,
            cycle_only,
        }
    }

    pub fn cycle_only(&self) -> bool {
        self.cycle_only
    }

    /// Check the current snapshot and resolve a deadlock if there is one
    pub fn resolve(
        &mut self,
        procs: &mut ProcessSet,
        ctx: &ExecContext<'_>,
        halt: &HaltSignal,
    ) -> Result<Resolution, SchedulerError> {
        let snapshot = ctx.resources.snapshot();
        let Some(cycle) = find_cycle(&snapshot) else {
            return Ok(Resolution::NoDeadlock);
        };

        let participants = cycle.processes.join(", ");
        warn!(
            tick = ctx.now,
            processes = %participants,
            resources = ?cycle.resources,
            "Deadlock detected"
        );
        ctx.log.system(
            ctx.now,
            ActionKind::DeadlockDetected,
            None,
            format!("involving {}", participants),
        );

        let Some(choice) = self.prompt(&cycle, &snapshot, ctx, halt) else {
            info!(tick = ctx.now, "Deadlock resolution abandoned");
            return Ok(Resolution::Abandoned);
        };

        let Some(released) = ctx.resources.force_release(choice)? else {
            // Ownership was checked under the same snapshot; nothing else runs
            // between the check and the release.
            return Ok(Resolution::NoDeadlock);
        };
        ctx.log.system(
            ctx.now,
            ActionKind::ForceReleased,
            Some(choice),
            format!("from {}", released.previous_owner),
        );

        let (unblocked, finished) = self.hand_off(choice, procs, ctx)?;
        info!(
            tick = ctx.now,
            resource = choice,
            unblocked = ?unblocked,
            finished = ?finished,
            "Deadlock resolved"
        );

        Ok(Resolution::Resolved {
            released,
            unblocked,
            finished,
        })
    }

    /// Ask until a valid resource is chosen; `None` abandons
    fn prompt(
        &mut self,
        cycle: &Cycle,
        snapshot: &ResourceSnapshot,
        ctx: &ExecContext<'_>,
        halt: &HaltSignal,
    ) -> Option<ResourceId> {
        let mut request = ResolutionRequest {
            participants: cycle.processes.clone(),
            candidates: cycle.resources.clone(),
            ownership: snapshot.owned(),
            waiting: snapshot.waiting.clone(),
            attempt: 1,
            rejection: None,
        };

        loop {
            if halt.is_halted() {
                return None;
            }
            let choice = self.resolver.choose(&request)?;
            match self.validate(choice, cycle, snapshot) {
                Ok(()) => return Some(choice),
                Err(rejection) => {
                    warn!(resource = choice, error = %rejection, "Resolution rejected");
                    ctx.log.system(
                        ctx.now,
                        ActionKind::ResolutionRejected,
                        Some(choice),
                        rejection.to_string(),
                    );
                    request.attempt += 1;
                    request.rejection = Some(rejection);
                }
            }
        }
    }

    fn validate(
        &self,
        choice: ResourceId,
        cycle: &Cycle,
        snapshot: &ResourceSnapshot,
    ) -> Result<(), ResolutionError> {
        if choice >= snapshot.owners.len() {
            return Err(ResolutionError::OutOfRange(choice));
        }
        if snapshot.owner(choice).is_none() {
            return Err(ResolutionError::NotOwned(choice));
        }
        if self.cycle_only && !cycle.resources.contains(&choice) {
            return Err(ResolutionError::NotInCycle(choice));
        }
        Ok(())
    }

    /// Offer freed resources to their waiters in FIFO order
    fn hand_off(
        &self,
        first: ResourceId,
        procs: &mut ProcessSet,
        ctx: &ExecContext<'_>,
    ) -> Result<(Vec<ProcessName>, Vec<ProcessName>), SchedulerError> {
        let mut unblocked = Vec::new();
        let mut finished = Vec::new();
        let mut worklist = VecDeque::from([first]);

        while let Some(resource) = worklist.pop_front() {
            for waiter in ctx.resources.waiters(resource) {
                let Some(idx) = procs.index_of(&waiter) else {
                    ctx.resources.withdraw(resource, &waiter);
                    continue;
                };
                let process = procs.get(idx);
                if !process.is_blocked() || process.blocked_on() != Some(resource) {
                    ctx.resources.withdraw(resource, &waiter);
                    continue;
                }

                if !ctx.resources.try_allocate(resource, &waiter)?.is_granted() {
                    break;
                }
                let process = procs.get_mut(idx);
                process.acquire(resource, ActionKind::AcquiredAfterRelease, ctx)?;
                unblocked.push(waiter.clone());

                if process.at_termination() {
                    let released = procs.terminate(idx, ctx)?;
                    finished.push(waiter);
                    worklist.extend(released);
                }
                break;
            }
        }

        Ok((unblocked, finished))
    }
}
