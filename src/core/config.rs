/*!
 * Simulation Configuration
 *
 * Runtime configuration with environment overrides
 *
 * Environment variables:
 * - PSIM_POLICY: fcfs | sjf-nonpreemptive | sjf-preemptive | round-robin
 * - PSIM_QUANTUM: round-robin quantum in time units (default: 2)
 * - PSIM_POOL_SIZE: number of exclusive resources (default: 10)
 * - PSIM_TIME_UNIT_MS: real milliseconds per time unit (default: 1000)
 * - PSIM_POLL_INTERVAL: blocked-allocation retry interval in units (default: 1)
 * - PSIM_AUTO_RESOLVE: resolve deadlocks without prompting (default: false)
 */

use super::errors::ConfigError;
use super::types::{DEFAULT_POLL_INTERVAL, DEFAULT_POOL_SIZE, DEFAULT_QUANTUM};
use crate::scheduler::Policy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimConfig {
    pub policy: Policy,
    pub quantum: u64,
    pub pool_size: usize,
    /// Real time slept per simulated unit
    pub time_unit: Duration,
    pub poll_interval: u64,
    pub auto_resolve: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            policy: Policy::Fcfs,
            quantum: DEFAULT_QUANTUM,
            pool_size: DEFAULT_POOL_SIZE,
            time_unit: Duration::from_secs(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
            auto_resolve: false,
        }
    }
}

impl SimConfig {
    /// Configuration for tests and batch runs: no real sleeping
    pub fn instant() -> Self {
        Self {
            time_unit: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Defaults overlaid with `PSIM_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (environment, tests)
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup("PSIM_POLICY") {
            self.policy = policy.parse()?;
        }
        if let Some(quantum) = lookup("PSIM_QUANTUM") {
            self.quantum = parse_number("PSIM_QUANTUM", &quantum)?;
        }
        if let Some(pool) = lookup("PSIM_POOL_SIZE") {
            self.pool_size = parse_number("PSIM_POOL_SIZE", &pool)? as usize;
        }
        if let Some(ms) = lookup("PSIM_TIME_UNIT_MS") {
            self.time_unit = Duration::from_millis(parse_number("PSIM_TIME_UNIT_MS", &ms)?);
        }
        if let Some(poll) = lookup("PSIM_POLL_INTERVAL") {
            self.poll_interval = parse_number("PSIM_POLL_INTERVAL", &poll)?;
        }
        if let Some(flag) = lookup("PSIM_AUTO_RESOLVE") {
            self.auto_resolve = matches!(flag.trim(), "1" | "true" | "yes");
        }
        self.validate()?;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_quantum(mut self, quantum: u64) -> Self {
        self.quantum = quantum;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Reject values the scheduler cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quantum == 0 {
            return Err(ConfigError::NotPositive("quantum".into()));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::NotPositive("pool_size".into()));
        }
        if self.poll_interval == 0 {
            return Err(ConfigError::NotPositive("poll_interval".into()));
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.policy, Policy::Fcfs);
        assert_eq!(config.quantum, 2);
        assert_eq!(config.pool_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlay() {
        let config = SimConfig::default()
            .overlay(lookup(&[
                ("PSIM_POLICY", "rr"),
                ("PSIM_QUANTUM", "3"),
                ("PSIM_TIME_UNIT_MS", "0"),
                ("PSIM_AUTO_RESOLVE", "true"),
            ]))
            .unwrap();
        assert_eq!(config.policy, Policy::RoundRobin);
        assert_eq!(config.quantum, 3);
        assert_eq!(config.time_unit, Duration::ZERO);
        assert!(config.auto_resolve);
    }

    #[test]
    fn test_overlay_rejects_bad_values() {
        assert_eq!(
            SimConfig::default().overlay(lookup(&[("PSIM_QUANTUM", "0")])),
            Err(ConfigError::NotPositive("quantum".into()))
        );
        assert!(matches!(
            SimConfig::default().overlay(lookup(&[("PSIM_POOL_SIZE", "many")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            SimConfig::default().overlay(lookup(&[("PSIM_POLICY", "lottery")])),
            Err(ConfigError::InvalidPolicy(_))
        ));
    }
}
