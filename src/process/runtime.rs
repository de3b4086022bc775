/*!
 * Process Runtime
 * Per-process state machine and the allocate / block / retry / terminate
 * primitives every scheduling policy shares
 */

use super::instruction::{estimate_burst, Instruction};
use super::loader::Workload;
use super::types::{ProcessRecord, ProcessState};
use crate::core::errors::SchedulerError;
use crate::core::types::{ProcessName, ResourceId, Tick};
use crate::monitoring::{ActionKind, ActionLog};
use crate::resources::{Allocation, ResourceManager};
use ahash::AHashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared handles an instruction executes against
#[derive(Debug, Clone, Copy)]
pub struct ExecContext<'a> {
    pub resources: &'a ResourceManager,
    pub log: &'a ActionLog,
    pub now: Tick,
    /// Policy tag appended to log notes
    pub tag: &'static str,
}

impl<'a> ExecContext<'a> {
    fn record(&self, process: &str, kind: ActionKind, resource: Option<ResourceId>, note: Option<String>) {
        let note = match note {
            Some(note) => format!("{} {}", note, self.tag),
            None => self.tag.to_string(),
        };
        self.log.record(self.now, process, kind, resource, Some(note));
    }
}

/// Result of executing an `Allocate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocateOutcome {
    Acquired,
    /// Waiting behind `behind`, the owner or an earlier waiter on a free resource
    Blocked { behind: ProcessName },
}

/// A simulated process
#[derive(Debug, Clone)]
pub struct Process {
    name: ProcessName,
    load_index: usize,
    program: Arc<[Instruction]>,
    estimated_burst: u64,
    state: ProcessState,
    pc: usize,
    /// Units left on a partially serviced `Wait`
    wait_remaining: Option<u64>,
    /// Tick at which a suspended `Wait` completes
    suspended_until: Option<Tick>,
    quantum_remaining: u64,
    blocked_on: Option<ResourceId>,
    blocked_since: Option<Tick>,
    started_at: Option<Tick>,
    finished_at: Option<Tick>,
}

impl Process {
    pub fn new(name: impl Into<ProcessName>, load_index: usize, program: Vec<Instruction>) -> Self {
        let estimated_burst = estimate_burst(&program);
        Self {
            name: name.into(),
            load_index,
            program: program.into(),
            estimated_burst,
            state: ProcessState::Ready,
            pc: 0,
            wait_remaining: None,
            suspended_until: None,
            quantum_remaining: 0,
            blocked_on: None,
            blocked_since: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn load_index(&self) -> usize {
        self.load_index
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    pub fn estimated_burst(&self) -> u64 {
        self.estimated_burst
    }

    /// Estimate of the work left, counting a partially serviced wait by its remainder
    pub fn remaining_estimate(&self) -> u64 {
        let rest = self.program.get(self.pc..).unwrap_or_default();
        match (rest.first(), self.wait_remaining) {
            (Some(Instruction::Wait(_)), Some(left)) => {
                left.saturating_add(estimate_burst(&rest[1..]))
            }
            _ => estimate_burst(rest),
        }
    }

    pub fn current(&self) -> Option<Instruction> {
        self.program.get(self.pc).copied()
    }

    /// True when the next step is the termination path
    pub fn at_termination(&self) -> bool {
        matches!(self.current(), None | Some(Instruction::End))
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_blocked(&self) -> bool {
        self.state == ProcessState::Blocked
    }

    pub fn blocked_on(&self) -> Option<ResourceId> {
        self.blocked_on
    }

    pub fn blocked_since(&self) -> Option<Tick> {
        self.blocked_since
    }

    pub fn suspended_until(&self) -> Option<Tick> {
        self.suspended_until
    }

    pub fn started_at(&self) -> Option<Tick> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<Tick> {
        self.finished_at
    }

    pub fn turnaround(&self) -> Option<Tick> {
        Some(self.finished_at? - self.started_at?)
    }

    pub fn quantum_remaining(&self) -> u64 {
        self.quantum_remaining
    }

    pub fn reset_quantum(&mut self, quantum: u64) {
        self.quantum_remaining = quantum;
    }

    pub fn consume_quantum(&mut self, units: u64) {
        self.quantum_remaining = self.quantum_remaining.saturating_sub(units);
    }

    fn transition(&mut self, to: ProcessState) -> Result<(), SchedulerError> {
        if !self.state.can_transition_to(to) {
            return Err(SchedulerError::InvalidTransition {
                process: self.name.clone(),
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    /// READY -> RUNNING; the first dispatch stamps the start time
    pub fn dispatch(&mut self, ctx: &ExecContext<'_>) -> Result<(), SchedulerError> {
        self.transition(ProcessState::Running)?;
        if self.started_at.is_none() {
            self.started_at = Some(ctx.now);
            info!(process = %self.name, tick = ctx.now, "Process started");
            ctx.record(&self.name, ActionKind::Started, None, None);
        }
        Ok(())
    }

    /// RUNNING -> READY at quantum expiry
    pub fn preempt(&mut self, ctx: &ExecContext<'_>) -> Result<(), SchedulerError> {
        self.transition(ProcessState::Ready)?;
        let remaining = self.program.len().saturating_sub(self.pc);
        ctx.record(
            &self.name,
            ActionKind::Requeued,
            None,
            Some(format!("{} instruction(s) left", remaining)),
        );
        Ok(())
    }

    /// Execute the `Allocate` at the program counter
    ///
    /// On success the program counter moves past the instruction. Otherwise
    /// the process becomes BLOCKED with the program counter left on it.
    pub fn allocate(
        &mut self,
        resource: ResourceId,
        ctx: &ExecContext<'_>,
    ) -> Result<AllocateOutcome, SchedulerError> {
        ctx.record(&self.name, ActionKind::Requested, Some(resource), None);

        let (behind, note) = match ctx.resources.try_allocate(resource, &self.name)? {
            Allocation::Granted => {
                ctx.record(&self.name, ActionKind::Allocated, Some(resource), None);
                self.pc += 1;
                return Ok(AllocateOutcome::Acquired);
            }
            Allocation::Queued { owner } => {
                let note = format!("held by {}", owner);
                (owner, note)
            }
            Allocation::Reserved { next } => {
                let note = format!("reserved for {}", next);
                (next, note)
            }
        };

        self.transition(ProcessState::Blocked)?;
        self.blocked_on = Some(resource);
        self.blocked_since = Some(ctx.now);
        ctx.record(&self.name, ActionKind::Blocked, Some(resource), Some(note));
        debug!(process = %self.name, resource, behind = %behind, "Process blocked");
        Ok(AllocateOutcome::Blocked { behind })
    }

    /// Retry the pending allocation of a BLOCKED process
    ///
    /// Returns true once the resource is held.
    pub fn retry(&mut self, ctx: &ExecContext<'_>) -> Result<bool, SchedulerError> {
        let Some(resource) = self.blocked_on else {
            return Ok(!self.is_blocked());
        };
        match ctx.resources.try_allocate(resource, &self.name)? {
            Allocation::Granted => {
                self.acquire(resource, ActionKind::AcquiredAfterWait, ctx)?;
                Ok(true)
            }
            Allocation::Queued { .. } | Allocation::Reserved { .. } => Ok(false),
        }
    }

    /// BLOCKED -> READY after the awaited resource was granted
    pub fn acquire(
        &mut self,
        resource: ResourceId,
        kind: ActionKind,
        ctx: &ExecContext<'_>,
    ) -> Result<(), SchedulerError> {
        self.transition(ProcessState::Ready)?;
        self.blocked_on = None;
        self.blocked_since = None;
        self.pc += 1;
        ctx.record(&self.name, kind, Some(resource), None);
        Ok(())
    }

    /// Units still owed on the `Wait` at the program counter
    pub fn wait_remaining(&self) -> Option<u64> {
        match self.current()? {
            Instruction::Wait(units) => Some(self.wait_remaining.unwrap_or(units)),
            _ => None,
        }
    }

    /// Service part of the current `Wait`; true when it completed
    pub fn elapse(&mut self, units: u64, ctx: &ExecContext<'_>) -> bool {
        let Some(left) = self.wait_remaining() else {
            return false;
        };
        let served = units.min(left);
        if served > 0 {
            ctx.record(&self.name, ActionKind::Waited, None, Some(format!("{} unit(s)", served)));
        }
        if served == left {
            self.wait_remaining = None;
            self.pc += 1;
            true
        } else {
            self.wait_remaining = Some(left - served);
            false
        }
    }

    /// Suspend in the current `Wait` until `now + units`
    pub fn suspend(&mut self, ctx: &ExecContext<'_>) -> Option<Tick> {
        let left = self.wait_remaining()?;
        ctx.record(&self.name, ActionKind::Waited, None, Some(format!("{} unit(s)", left)));
        let until = ctx.now.saturating_add(left);
        self.suspended_until = Some(until);
        self.wait_remaining = Some(left);
        Some(until)
    }

    /// Finish a suspended `Wait` whose deadline has passed; RUNNING -> READY
    pub fn wake(&mut self, now: Tick) -> Result<bool, SchedulerError> {
        match self.suspended_until {
            Some(until) if until <= now => {
                self.transition(ProcessState::Ready)?;
                self.suspended_until = None;
                self.wait_remaining = None;
                self.pc += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// RUNNING and not parked in a `Wait`
    pub fn is_on_cpu(&self) -> bool {
        self.state == ProcessState::Running && self.suspended_until.is_none()
    }

    /// Can be given the CPU right now
    pub fn is_runnable(&self) -> bool {
        self.state == ProcessState::Ready || self.is_on_cpu()
    }

    /// Termination path: FINISHED, release everything
    ///
    /// A READY process is dispatched first so the state machine stays on its
    /// edges. Returns the resources that were freed.
    pub fn terminate(&mut self, ctx: &ExecContext<'_>) -> Result<Vec<ResourceId>, SchedulerError> {
        if self.state == ProcessState::Ready {
            self.dispatch(ctx)?;
        }
        self.transition(ProcessState::Finished)?;
        self.finished_at = Some(ctx.now);
        if self.current() == Some(Instruction::End) {
            self.pc += 1;
        }
        self.suspended_until = None;
        self.wait_remaining = None;

        ctx.record(&self.name, ActionKind::Ended, None, None);
        let released = ctx.resources.release_all(&self.name);
        for &resource in &released {
            ctx.record(&self.name, ActionKind::Released, Some(resource), None);
        }
        info!(
            process = %self.name,
            tick = ctx.now,
            turnaround = ?self.turnaround(),
            released = ?released,
            "Process finished"
        );
        Ok(released)
    }

    pub fn record(&self) -> ProcessRecord {
        ProcessRecord {
            name: self.name.clone(),
            state: self.state,
            start: self.started_at,
            finish: self.finished_at,
            turnaround: self.turnaround(),
            estimated_burst: self.estimated_burst,
        }
    }
}

/// All processes of one run, in load order
#[derive(Debug, Clone, Default)]
pub struct ProcessSet {
    procs: Vec<Process>,
    index: AHashMap<ProcessName, usize>,
    completion: Vec<usize>,
}

impl ProcessSet {
    pub fn from_workload(workload: &Workload) -> Self {
        let procs: Vec<Process> = workload
            .programs()
            .iter()
            .enumerate()
            .map(|(i, p)| Process::new(p.name.clone(), i, p.instructions.clone()))
            .collect();
        let index = procs
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect();
        Self {
            procs,
            index,
            completion: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.procs.iter()
    }

    pub fn get(&self, idx: usize) -> &Process {
        &self.procs[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Process {
        &mut self.procs[idx]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Process> {
        self.index_of(name).map(|i| &self.procs[i])
    }

    pub fn all_finished(&self) -> bool {
        self.procs.iter().all(Process::is_finished)
    }

    /// Run the termination path and remember completion order
    pub fn terminate(
        &mut self,
        idx: usize,
        ctx: &ExecContext<'_>,
    ) -> Result<Vec<ResourceId>, SchedulerError> {
        let released = self.procs[idx].terminate(ctx)?;
        self.completion.push(idx);
        Ok(released)
    }

    /// Process table: finished rows in completion order, then the rest in load order
    pub fn records(&self) -> Vec<ProcessRecord> {
        let mut rows: Vec<ProcessRecord> = self
            .completion
            .iter()
            .map(|&i| self.procs[i].record())
            .collect();
        rows.extend(
            self.procs
                .iter()
                .filter(|p| !p.is_finished())
                .map(Process::record),
        );
        rows
    }
}
