/*!
 * Round-Robin Engine
 * FIFO ready queue, fixed quantum, wait splitting across slots
 */

use super::{Interrupt, Run};
use crate::deadlock::Resolution;
use crate::process::{AllocateOutcome, Instruction};
use std::collections::VecDeque;
use tracing::debug;

/// How a dispatch slot ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotEnd {
    Finished,
    Blocked,
    Expired,
}

impl Run<'_> {
    pub(super) async fn round_robin(&mut self) -> Result<(), Interrupt> {
        let mut queue: VecDeque<usize> = (0..self.procs.len()).collect();
        // Consecutive turns in which a blocked process failed to retry
        let mut idle_turns = 0usize;

        while let Some(idx) = queue.pop_front() {
            self.halt.check()?;
            if self.procs.get(idx).is_finished() {
                continue;
            }

            if self.procs.get(idx).is_blocked() {
                let ctx = self.ctx();
                if !self.procs.get_mut(idx).retry(&ctx)? {
                    queue.push_back(idx);
                    idle_turns += 1;
                    self.check_global_block(&queue, &mut idle_turns)?;
                    continue;
                }
            }
            idle_turns = 0;

            match self.slot(idx).await? {
                SlotEnd::Finished => {}
                SlotEnd::Blocked => {
                    queue.push_back(idx);
                    self.check_global_block(&queue, &mut idle_turns)?;
                }
                SlotEnd::Expired => queue.push_back(idx),
            }
        }
        Ok(())
    }

    /// Every queued process BLOCKED: hand over to the coordinator
    fn check_global_block(
        &mut self,
        queue: &VecDeque<usize>,
        idle_turns: &mut usize,
    ) -> Result<(), Interrupt> {
        let all_blocked = queue
            .iter()
            .all(|&idx| self.procs.get(idx).is_blocked() || self.procs.get(idx).is_finished());
        if !all_blocked {
            return Ok(());
        }

        debug!(tick = self.now(), queued = queue.len(), "Every queued process is blocked");
        match self.resolve()? {
            Resolution::Resolved { .. } => *idle_turns = 0,
            // A full rotation of failed retries with no cycle cannot make progress
            _ if *idle_turns > queue.len() => return Err(self.stalled()),
            _ => {}
        }
        Ok(())
    }

    /// One dispatch slot for a READY process
    async fn slot(&mut self, idx: usize) -> Result<SlotEnd, Interrupt> {
        let ctx = self.ctx();
        let quantum = self.quantum;
        let process = self.procs.get_mut(idx);
        process.dispatch(&ctx)?;
        process.reset_quantum(quantum);

        loop {
            let ctx = self.ctx();
            let process = self.procs.get_mut(idx);

            match process.current() {
                None | Some(Instruction::End) => {
                    self.procs.terminate(idx, &ctx)?;
                    return Ok(SlotEnd::Finished);
                }
                Some(Instruction::Allocate(resource)) => match process.allocate(resource, &ctx)? {
                    AllocateOutcome::Acquired => process.consume_quantum(1),
                    AllocateOutcome::Blocked { .. } => return Ok(SlotEnd::Blocked),
                },
                Some(Instruction::Wait(_)) => {
                    let left = process.wait_remaining().unwrap_or(0);
                    let served = left.min(process.quantum_remaining());
                    process.elapse(served, &ctx);
                    process.consume_quantum(served);
                    self.advance(served).await?;
                }
            }

            let process = self.procs.get(idx);
            if process.quantum_remaining() == 0 && !process.at_termination() {
                let ctx = self.ctx();
                self.procs.get_mut(idx).preempt(&ctx)?;
                return Ok(SlotEnd::Expired);
            }
        }
    }
}
