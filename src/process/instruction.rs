/*!
 * Instructions
 * Parsed program instructions and burst estimation
 */

use crate::core::errors::LoadError;
use crate::core::types::{ResourceId, MAX_WAIT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One program instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum Instruction {
    /// Let `n` time units elapse
    Wait(u64),
    /// Take exclusive ownership of a resource
    Allocate(ResourceId),
    /// Release everything and finish
    End,
}

impl Instruction {
    /// Static cost used for SJF ordering
    pub const fn cost(&self) -> u64 {
        match self {
            Self::Wait(units) => *units,
            Self::Allocate(_) => 1,
            Self::End => 0,
        }
    }

    /// Parse one raw token
    ///
    /// Returns `Ok(None)` for loop markers (`for ...`, `next ...`), which carry
    /// no behaviour.
    pub fn parse(process: &str, token: &str, pool_size: usize) -> Result<Option<Self>, LoadError> {
        let malformed = || LoadError::MalformedInstruction {
            process: process.to_string(),
            token: token.to_string(),
        };

        let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        let lower = compact.to_lowercase();

        if lower == "end" {
            return Ok(Some(Self::End));
        }
        if lower.starts_with("for") || lower.starts_with("next") {
            return Ok(None);
        }
        if let Some(args) = call_args(&lower, "wait") {
            let units = args.parse::<u64>().map_err(|_| malformed())?;
            if units > MAX_WAIT {
                return Err(LoadError::WaitTooLong {
                    process: process.to_string(),
                    units,
                    limit: MAX_WAIT,
                });
            }
            return Ok(Some(Self::Wait(units)));
        }
        if let Some(args) = call_args(&lower, "resource") {
            let (id, op) = args.split_once(',').ok_or_else(malformed)?;
            if op != "allocate" {
                return Err(malformed());
            }
            let resource = id.parse::<ResourceId>().map_err(|_| malformed())?;
            if resource >= pool_size {
                return Err(LoadError::InvalidResourceId {
                    process: process.to_string(),
                    resource,
                    pool_size,
                });
            }
            return Ok(Some(Self::Allocate(resource)));
        }

        Err(malformed())
    }
}

/// `name(args)` -> `args`
fn call_args<'a>(token: &'a str, name: &str) -> Option<&'a str> {
    token
        .strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wait(units) => write!(f, "wait({})", units),
            Self::Allocate(resource) => write!(f, "resource({}, allocate)", resource),
            Self::End => f.write_str("end"),
        }
    }
}

/// Sum of instruction costs: wait durations plus one per allocation
pub fn estimate_burst(program: &[Instruction]) -> u64 {
    program
        .iter()
        .fold(0u64, |total, instruction| total.saturating_add(instruction.cost()))
}
