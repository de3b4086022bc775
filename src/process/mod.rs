/*!
 * Process Module
 * Programs, the per-process state machine, and the process table
 */

pub mod instruction;
pub mod loader;
pub mod runtime;
pub mod types;

// Re-export for convenience
pub use instruction::{estimate_burst, Instruction};
pub use loader::{Program, Workload};
pub use runtime::{AllocateOutcome, ExecContext, Process, ProcessSet};
pub use types::{ProcessRecord, ProcessState};
