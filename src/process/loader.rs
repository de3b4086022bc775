/*!
 * Workload Loader
 * Turns raw program descriptions into validated instruction sequences
 *
 * Program file format:
 *
 * ```text
 * # comment
 * program P1
 * resource(0, allocate)
 * wait(2)
 * end
 * ```
 */

use super::instruction::Instruction;
use crate::core::errors::{LoadError, SimError};
use crate::core::types::{ProcessName, MAX_WAIT};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A named, parsed program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub name: ProcessName,
    pub instructions: Vec<Instruction>,
}

/// Programs in load order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    programs: Vec<Program>,
}

impl Workload {
    /// Build from already parsed programs
    pub fn new<I, N>(programs: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (N, Vec<Instruction>)>,
        N: Into<ProcessName>,
    {
        let mut workload = Self::default();
        for (name, instructions) in programs {
            workload.push(name.into(), instructions)?;
        }
        Ok(workload)
    }

    /// Build from a mapping of process name to raw instruction tokens
    pub fn from_tokens<I, N, T, S>(mapping: I, pool_size: usize) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<ProcessName>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut workload = Self::default();
        for (name, tokens) in mapping {
            let name = name.into();
            let mut instructions = Vec::new();
            for token in tokens {
                if let Some(instruction) = Instruction::parse(&name, token.as_ref(), pool_size)? {
                    instructions.push(instruction);
                }
            }
            workload.push(name, instructions)?;
        }
        Ok(workload)
    }

    /// Parse the text program format
    pub fn parse(text: &str, pool_size: usize) -> Result<Self, LoadError> {
        let mut mapping: Vec<(ProcessName, Vec<&str>)> = Vec::new();

        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("program") {
                let name = rest.split_whitespace().next().unwrap_or_default();
                if name.is_empty() {
                    return Err(LoadError::MalformedInstruction {
                        process: String::new(),
                        token: line.to_string(),
                    });
                }
                mapping.push((name.to_string(), Vec::new()));
                continue;
            }
            match mapping.last_mut() {
                Some((_, tokens)) => tokens.push(line),
                None => return Err(LoadError::OrphanInstruction(line.to_string())),
            }
        }

        Self::from_tokens(mapping, pool_size)
    }

    /// Read and parse a program file
    pub fn load(path: impl AsRef<Path>, pool_size: usize) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let workload = Self::parse(&text, pool_size)?;
        info!(path = %path.display(), processes = workload.len(), "Program file loaded");
        Ok(workload)
    }

    fn push(&mut self, name: ProcessName, instructions: Vec<Instruction>) -> Result<(), LoadError> {
        if self.programs.iter().any(|p| p.name == name) {
            return Err(LoadError::DuplicateProcess(name));
        }
        self.programs.push(Program { name, instructions });
        Ok(())
    }

    /// Check every resource id against a pool size, and every wait against [`MAX_WAIT`]
    pub fn validate(&self, pool_size: usize) -> Result<(), LoadError> {
        let mut seen = AHashSet::new();
        for program in &self.programs {
            if !seen.insert(program.name.as_str()) {
                return Err(LoadError::DuplicateProcess(program.name.clone()));
            }
            for instruction in &program.instructions {
                match *instruction {
                    Instruction::Allocate(resource) if resource >= pool_size => {
                        return Err(LoadError::InvalidResourceId {
                            process: program.name.clone(),
                            resource,
                            pool_size,
                        });
                    }
                    Instruction::Wait(units) if units > MAX_WAIT => {
                        return Err(LoadError::WaitTooLong {
                            process: program.name.clone(),
                            units,
                            limit: MAX_WAIT,
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
