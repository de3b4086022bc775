/*!
 * Ordered Engine
 * FCFS, SJF and SRTF: dispatch the runnable process with the smallest key
 *
 * `Allocate` and `End` take no time. A `Wait` parks the process off the CPU
 * until its deadline, so others run in the meantime. The clock only moves
 * when nothing is runnable: then it jumps to the next wake-up (at most one
 * poll interval ahead while anything is blocked), blocked processes retry,
 * and long-blocked processes trigger deadlock detection.
 */

use super::{Interrupt, Policy, Run};
use crate::deadlock::Resolution;
use crate::process::{Instruction, Process};
use tracing::{debug, trace};

/// Dispatch key; smaller runs first, load order breaks ties
fn key(policy: Policy, process: &Process) -> (u64, usize) {
    let cost = match policy {
        Policy::Fcfs | Policy::RoundRobin => 0,
        Policy::SjfNonPreemptive => process.estimated_burst(),
        Policy::SjfPreemptive => process.remaining_estimate(),
    };
    (cost, process.load_index())
}

impl Run<'_> {
    pub(super) async fn ordered(&mut self) -> Result<(), Interrupt> {
        let mut current: Option<usize> = None;

        loop {
            self.halt.check()?;
            if self.procs.all_finished() {
                return Ok(());
            }

            match self.pick(current)? {
                Some(idx) => {
                    current = Some(idx);
                    self.step(idx)?;
                }
                None => {
                    current = None;
                    self.idle().await?;
                }
            }
        }
    }

    /// Choose the process for the next instruction
    fn pick(&mut self, current: Option<usize>) -> Result<Option<usize>, Interrupt> {
        if let Some(idx) = current {
            if !self.policy.is_preemptive() && self.procs.get(idx).is_on_cpu() {
                return Ok(Some(idx));
            }
        }

        let policy = self.policy;
        let next = self
            .procs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_runnable())
            .min_by_key(|(_, p)| key(policy, p))
            .map(|(idx, _)| idx);

        if let (Some(prev), Some(next)) = (current, next) {
            if prev != next && self.procs.get(prev).is_on_cpu() {
                let ctx = self.ctx();
                debug!(
                    from = self.procs.get(prev).name(),
                    to = self.procs.get(next).name(),
                    "Preempted by shorter remaining time"
                );
                self.procs.get_mut(prev).preempt(&ctx)?;
            }
        }
        Ok(next)
    }

    /// Execute one instruction of a runnable process
    fn step(&mut self, idx: usize) -> Result<(), Interrupt> {
        let ctx = self.ctx();
        let process = self.procs.get_mut(idx);
        if !process.is_on_cpu() {
            process.dispatch(&ctx)?;
        }

        match process.current() {
            None | Some(Instruction::End) => {
                self.procs.terminate(idx, &ctx)?;
            }
            Some(Instruction::Allocate(resource)) => {
                process.allocate(resource, &ctx)?;
            }
            Some(Instruction::Wait(0)) => {
                process.elapse(0, &ctx);
            }
            Some(Instruction::Wait(_)) => {
                if let Some(until) = process.suspend(&ctx) {
                    trace!(process = process.name(), until, "Suspended in wait");
                }
            }
        }
        Ok(())
    }

    /// Nothing is runnable: let time pass, wake sleepers, retry blocked
    async fn idle(&mut self) -> Result<(), Interrupt> {
        let next_wake = self.procs.iter().filter_map(Process::suspended_until).min();
        let has_blocked = self.procs.iter().any(Process::is_blocked);
        if next_wake.is_none() && !has_blocked {
            return Err(self.stalled());
        }

        // Blocked processes are polled; sleepers alone let the clock jump
        let horizon = self.now() + self.poll_interval;
        let target = match next_wake {
            Some(wake) if has_blocked => wake.min(horizon),
            Some(wake) => wake,
            None => horizon,
        };
        self.advance_to(target).await?;

        let now = self.now();
        for idx in 0..self.procs.len() {
            self.procs.get_mut(idx).wake(now)?;
        }

        let mut blocked: Vec<usize> = (0..self.procs.len())
            .filter(|&idx| self.procs.get(idx).is_blocked())
            .collect();
        blocked.sort_by_key(|&idx| {
            let p = self.procs.get(idx);
            (p.blocked_since(), p.load_index())
        });

        let ctx = self.ctx();
        let poll = self.poll_interval;
        let mut long_blocked = false;
        for idx in blocked {
            let process = self.procs.get_mut(idx);
            if process.retry(&ctx)? {
                continue;
            }
            if process
                .blocked_since()
                .is_some_and(|since| now - since >= poll)
            {
                long_blocked = true;
            }
        }

        if long_blocked {
            let resolution = self.resolve()?;
            let progress = self.procs.iter().any(Process::is_runnable)
                || self.procs.iter().any(|p| p.suspended_until().is_some());
            if resolution == Resolution::NoDeadlock && !progress && !self.free_resource_awaited() {
                return Err(self.stalled());
            }
        }
        Ok(())
    }

    /// Some blocked process waits on a resource nobody holds
    fn free_resource_awaited(&self) -> bool {
        self.procs.iter().any(|p| {
            p.blocked_on()
                .is_some_and(|resource| self.resources.owner(resource).is_none())
        })
    }
}
