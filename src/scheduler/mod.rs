/*!
 * Scheduler
 * Runs a workload to completion under one of four policies
 *
 * FCFS and both SJF variants share the ordered engine, which differs per
 * policy only in the dispatch key and in whether the key is re-evaluated
 * before every instruction. Round-robin has its own engine with a FIFO ready
 * queue and a fixed quantum.
 */

mod builder;
mod ordered;
mod round_robin;
pub mod types;

pub use builder::SchedulerBuilder;
pub use types::{Policy, RunOutcome, SimulationReport};

use crate::core::clock::{HaltSignal, Halted, SimClock};
use crate::core::config::SimConfig;
use crate::core::errors::{ResourceError, SchedulerError, SimError};
use crate::core::types::Tick;
use crate::deadlock::{Coordinator, Resolution};
use crate::monitoring::{generate_run_id, run_span, ActionKind, ActionLog};
use crate::process::{ExecContext, ProcessSet, Workload};
use crate::resources::{ResourceManager, ResourceSnapshot};
use tracing::{error, info, Instrument};

/// Why an engine loop stopped before every process finished
#[derive(Debug)]
enum Interrupt {
    Halted,
    Failed(SchedulerError),
}

impl From<Halted> for Interrupt {
    fn from(_: Halted) -> Self {
        Interrupt::Halted
    }
}

impl From<SchedulerError> for Interrupt {
    fn from(err: SchedulerError) -> Self {
        Interrupt::Failed(err)
    }
}

impl From<ResourceError> for Interrupt {
    fn from(err: ResourceError) -> Self {
        Interrupt::Failed(err.into())
    }
}

/// Mutable state of one run, shared by both engines
struct Run<'a> {
    procs: ProcessSet,
    clock: SimClock,
    resources: &'a ResourceManager,
    log: &'a ActionLog,
    coordinator: &'a mut Coordinator,
    halt: HaltSignal,
    policy: Policy,
    quantum: u64,
    poll_interval: u64,
}

impl<'a> Run<'a> {
    fn ctx(&self) -> ExecContext<'a> {
        ExecContext {
            resources: self.resources,
            log: self.log,
            now: self.clock.now(),
            tag: self.policy.tag(),
        }
    }

    fn now(&self) -> Tick {
        self.clock.now()
    }

    async fn advance(&mut self, units: u64) -> Result<(), Interrupt> {
        self.clock.advance(units, &mut self.halt).await?;
        Ok(())
    }

    async fn advance_to(&mut self, tick: Tick) -> Result<(), Interrupt> {
        self.clock.advance_to(tick, &mut self.halt).await?;
        Ok(())
    }

    /// Run the coordinator; an abandoned resolution halts the run
    fn resolve(&mut self) -> Result<Resolution, Interrupt> {
        let ctx = self.ctx();
        match self.coordinator.resolve(&mut self.procs, &ctx, &self.halt)? {
            Resolution::Abandoned => Err(Interrupt::Halted),
            resolution => Ok(resolution),
        }
    }

    fn stalled(&self) -> Interrupt {
        let blocked = self.procs.iter().filter(|p| p.is_blocked()).count();
        Interrupt::Failed(SchedulerError::Stalled {
            tick: self.now(),
            blocked,
        })
    }
}

/// Process scheduler
pub struct Scheduler {
    config: SimConfig,
    resources: ResourceManager,
    log: ActionLog,
    coordinator: Coordinator,
    halt: HaltSignal,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn policy(&self) -> Policy {
        self.config.policy
    }

    /// Live ownership and wait state
    pub fn resources(&self) -> ResourceSnapshot {
        self.resources.snapshot()
    }

    /// Handle on the resource pool for observers running alongside the scheduler
    pub fn resource_manager(&self) -> ResourceManager {
        self.resources.clone()
    }

    /// Handle on the action log; entries appear as the run progresses
    pub fn action_log(&self) -> ActionLog {
        self.log.clone()
    }

    /// Run `workload` until every process finished or the run is halted
    pub async fn run(mut self, workload: &Workload) -> Result<SimulationReport, SimError> {
        workload.validate(self.config.pool_size)?;

        let run_id = generate_run_id();
        let span = run_span(&run_id, self.config.policy.as_str(), workload.len());
        let policy = self.config.policy;

        async move {
            info!(
                quantum = self.config.quantum,
                pool_size = self.config.pool_size,
                "Simulation started"
            );

            let mut run = Run {
                procs: ProcessSet::from_workload(workload),
                clock: SimClock::new(self.config.time_unit),
                resources: &self.resources,
                log: &self.log,
                coordinator: &mut self.coordinator,
                halt: self.halt.clone(),
                policy,
                quantum: self.config.quantum,
                poll_interval: self.config.poll_interval,
            };

            let result = match policy {
                Policy::RoundRobin => run.round_robin().await,
                _ => run.ordered().await,
            };

            let outcome = match result {
                Ok(()) => RunOutcome::Completed,
                Err(Interrupt::Halted) => {
                    let unfinished = run.procs.iter().filter(|p| !p.is_finished()).count();
                    run.log.system(
                        run.now(),
                        ActionKind::Halted,
                        None,
                        format!("{} process(es) unfinished", unfinished),
                    );
                    info!(tick = run.now(), unfinished, "Simulation halted");
                    RunOutcome::Halted
                }
                Err(Interrupt::Failed(err)) => {
                    error!(tick = run.now(), error = %err, "Simulation failed");
                    return Err(SimError::from(err));
                }
            };

            let report = SimulationReport {
                policy,
                outcome,
                elapsed: run.now(),
                processes: run.procs.records(),
                actions: self.log.entries(),
                forced_releases: self.resources.forced_releases(),
                final_ownership: self.resources.snapshot().owners,
            };
            info!(
                elapsed = report.elapsed,
                completed = report.completed().len(),
                forced_releases = report.forced_releases.len(),
                "Simulation finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}
