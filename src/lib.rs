/*!
 * Pseudo-OS Simulator Library
 * Process scheduling, exclusive resources and deadlock handling
 */

pub mod core;
pub mod deadlock;
pub mod monitoring;
pub mod presentation;
pub mod process;
pub mod resources;
pub mod scheduler;

// Re-exports
pub use crate::core::errors::*;
pub use crate::core::{halt_channel, HaltHandle, HaltSignal, SimConfig};
pub use deadlock::{
    Abandon, Cycle, DeadlockResolver, LowestCandidate, ResolutionRequest, ScriptedResolver,
};
pub use monitoring::{init_tracing, ActionEntry, ActionKind, ActionLog};
pub use process::{Instruction, ProcessRecord, ProcessState, Workload};
pub use resources::{ResourceManager, ResourceSnapshot};
pub use scheduler::{Policy, RunOutcome, Scheduler, SchedulerBuilder, SimulationReport};
