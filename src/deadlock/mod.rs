/*!
 * Deadlock Module
 * Wait-for graph detection and operator-driven resolution
 */

pub mod coordinator;
pub mod detector;
pub mod resolver;

pub use coordinator::{Coordinator, Resolution};
pub use detector::{find_cycle, has_cycle, Cycle, WaitForGraph};
pub use resolver::{Abandon, DeadlockResolver, LowestCandidate, ResolutionRequest, ScriptedResolver};
