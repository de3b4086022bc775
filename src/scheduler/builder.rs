/*!
 * Scheduler Builder
 * Builder pattern for Scheduler construction
 */

use super::{Policy, Scheduler};
use crate::core::clock::HaltSignal;
use crate::core::config::SimConfig;
use crate::core::errors::ConfigError;
use crate::deadlock::{Coordinator, DeadlockResolver, LowestCandidate};
use crate::monitoring::ActionLog;
use crate::resources::ResourceManager;
use std::time::Duration;
use tracing::info;

/// Builder for Scheduler
pub struct SchedulerBuilder {
    config: SimConfig,
    resolver: Option<Box<dyn DeadlockResolver>>,
    halt: Option<HaltSignal>,
}

impl SchedulerBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: SimConfig::default(),
            resolver: None,
            halt: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Round-robin quantum in time units
    pub fn with_quantum(mut self, quantum: u64) -> Self {
        self.config.quantum = quantum;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.config.pool_size = pool_size;
        self
    }

    /// Real time slept per simulated unit; zero runs as fast as possible
    pub fn with_time_unit(mut self, time_unit: Duration) -> Self {
        self.config.time_unit = time_unit;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: u64) -> Self {
        self.config.poll_interval = poll_interval;
        self
    }

    /// Operator consulted when a deadlock is detected
    pub fn with_resolver<R>(mut self, resolver: R) -> Self
    where
        R: DeadlockResolver + 'static,
    {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// External stop signal
    pub fn with_halt(mut self, halt: HaltSignal) -> Self {
        self.halt = Some(halt);
        self
    }

    /// Build the Scheduler
    ///
    /// Without a resolver, deadlocks are broken by revoking the lowest
    /// candidate resource. Without a halt signal the run cannot be stopped
    /// from outside.
    pub fn build(self) -> Result<Scheduler, ConfigError> {
        self.config.validate()?;

        let resolver = self
            .resolver
            .unwrap_or_else(|| Box::new(LowestCandidate));
        let cycle_only = self.config.policy == Policy::RoundRobin;

        info!(
            policy = %self.config.policy,
            quantum = self.config.quantum,
            pool_size = self.config.pool_size,
            time_unit_ms = self.config.time_unit.as_millis() as u64,
            "Scheduler initialized"
        );

        Ok(Scheduler {
            resources: ResourceManager::new(self.config.pool_size),
            log: ActionLog::new(),
            coordinator: Coordinator::new(resolver, cycle_only),
            halt: self.halt.unwrap_or_else(HaltSignal::never),
            config: self.config,
        })
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
