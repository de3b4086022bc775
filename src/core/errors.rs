/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{ProcessName, ResourceId};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Program loading and validation errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LoadError {
    #[error("Malformed instruction in {process}: '{token}'")]
    #[diagnostic(
        code(load::malformed_instruction),
        help("Valid instructions are wait(N), resource(R, allocate) and end.")
    )]
    MalformedInstruction { process: ProcessName, token: String },

    #[error("Invalid resource id {resource} in {process}: pool has {pool_size} resources")]
    #[diagnostic(
        code(load::invalid_resource_id),
        help("Resource ids must lie in [0, pool size).")
    )]
    InvalidResourceId {
        process: ProcessName,
        resource: ResourceId,
        pool_size: usize,
    },

    #[error("Wait of {units} units in {process} exceeds the limit of {limit}")]
    #[diagnostic(
        code(load::wait_too_long),
        help("Split the wait or shorten it; a single wait may last at most {limit} units.")
    )]
    WaitTooLong {
        process: ProcessName,
        units: u64,
        limit: u64,
    },

    #[error("Process {0} is defined more than once")]
    #[diagnostic(
        code(load::duplicate_process),
        help("Every program block needs a unique name.")
    )]
    DuplicateProcess(ProcessName),

    #[error("Instruction outside of any program block: '{0}'")]
    #[diagnostic(
        code(load::orphan_instruction),
        help("Start a block with `program <name>` before listing instructions.")
    )]
    OrphanInstruction(String),
}

/// Resource manager errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ResourceError {
    #[error("Resource {resource} does not exist (pool size {pool_size})")]
    #[diagnostic(code(resource::out_of_range))]
    OutOfRange {
        resource: ResourceId,
        pool_size: usize,
    },
}

/// Rejected operator choices during deadlock resolution
///
/// Always recovered locally by asking the operator again.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ResolutionError {
    #[error("Resource {0} does not exist")]
    #[diagnostic(code(resolution::out_of_range))]
    OutOfRange(ResourceId),

    #[error("Resource {0} is not currently owned")]
    #[diagnostic(
        code(resolution::not_owned),
        help("Only a held resource can be force-released.")
    )]
    NotOwned(ResourceId),

    #[error("Resource {0} is not part of the detected cycle")]
    #[diagnostic(
        code(resolution::not_in_cycle),
        help("Pick one of the listed candidate resources.")
    )]
    NotInCycle(ResourceId),
}

/// Scheduler runtime errors, fatal to the run
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SchedulerError {
    #[error("Invalid state transition for {process}: {from} -> {to}")]
    #[diagnostic(
        code(scheduler::invalid_transition),
        help("The process state machine was driven out of order. Please report this issue.")
    )]
    InvalidTransition {
        process: ProcessName,
        from: String,
        to: String,
    },

    #[error("Scheduler stalled at tick {tick}: {blocked} blocked process(es) with no way forward")]
    #[diagnostic(
        code(scheduler::stalled),
        help("Blocked processes wait on resources that will never be released.")
    )]
    Stalled { tick: u64, blocked: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resource(#[from] ResourceError),
}

/// Configuration errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Invalid scheduling policy '{0}'")]
    #[diagnostic(
        code(config::invalid_policy),
        help("Valid: fcfs, sjf-nonpreemptive, sjf-preemptive, round-robin.")
    )]
    InvalidPolicy(String),

    #[error("Invalid value for {key}: '{value}'")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { key: String, value: String },

    #[error("{0} must be a positive integer")]
    #[diagnostic(code(config::not_positive))]
    NotPositive(String),
}

/// Unified simulator error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum SimError {
    #[error("Load error: {0}")]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error("Scheduler error: {0}")]
    #[diagnostic(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(sim::io_error),
        help("Check that the program file exists and is readable.")
    )]
    Io(String),
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Io(err.to_string())
    }
}

impl From<ResourceError> for SimError {
    fn from(err: ResourceError) -> Self {
        SimError::Scheduler(err.into())
    }
}

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;
