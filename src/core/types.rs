/*!
 * Core Types
 * Common types used across the simulator
 */

/// Resource identifier, an index into the fixed resource pool
pub type ResourceId = usize;

/// Logical simulation time, in whole time units since the run started
pub type Tick = u64;

/// Process name as written in the program description
pub type ProcessName = String;

/// Actor recorded for entries the simulator itself produces
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// Default number of exclusive resources in the pool
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Default round-robin quantum (time units)
pub const DEFAULT_QUANTUM: u64 = 2;

/// Default interval between retries of a blocked allocation (time units)
pub const DEFAULT_POLL_INTERVAL: u64 = 1;

/// Longest single `wait(N)` a program may contain (time units)
pub const MAX_WAIT: u64 = 1_000_000;
