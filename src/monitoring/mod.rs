/*!
 * Monitoring Module
 * Structured tracing and the simulation action log
 */

pub mod action_log;
pub mod tracer;

pub use action_log::{ActionEntry, ActionKind, ActionLog};
pub use tracer::{generate_run_id, init_tracing, run_span};
