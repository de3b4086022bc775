/*!
 * Scheduler Tests
 * End-to-end runs of every policy against small workloads
 */

use pretty_assertions::assert_eq;
use pseudo_os_sim::{
    halt_channel, Abandon, ActionKind, Instruction, Policy, ProcessState, RunOutcome, Scheduler,
    SimConfig, SimulationReport, Workload,
};
use std::time::Duration;
use Instruction::*;

#[path = "support/invariants.rs"]
mod invariants;

use invariants::assert_mutual_exclusion;

fn workload(programs: &[(&str, &[Instruction])]) -> Workload {
    Workload::new(programs.iter().map(|(name, program)| (*name, program.to_vec()))).unwrap()
}

async fn run(policy: Policy, quantum: u64, workload: &Workload) -> SimulationReport {
    Scheduler::builder()
        .with_config(SimConfig::instant().with_policy(policy).with_quantum(quantum))
        .build()
        .unwrap()
        .run(workload)
        .await
        .unwrap()
}

fn position(report: &SimulationReport, process: &str, kind: ActionKind) -> usize {
    report
        .actions
        .iter()
        .position(|e| e.process == process && e.kind == kind)
        .unwrap_or_else(|| panic!("no {:?} entry for {}", kind, process))
}

fn count(report: &SimulationReport, process: &str, kind: ActionKind) -> usize {
    report
        .actions
        .iter()
        .filter(|e| e.process == process && e.kind == kind)
        .count()
}

fn assert_turnaround(report: &SimulationReport) {
    for row in &report.processes {
        if let (Some(start), Some(finish)) = (row.start, row.finish) {
            assert!(finish >= start);
            assert_eq!(row.turnaround, Some(finish - start));
        }
    }
}

#[tokio::test]
async fn test_fcfs_contention_blocks_until_end() {
    let w = workload(&[
        ("P1", &[Allocate(0), Wait(2), End]),
        ("P2", &[Allocate(0), End]),
    ]);
    let report = run(Policy::Fcfs, 2, &w).await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed(), vec!["P1", "P2"]);
    assert!(position(&report, "P2", ActionKind::Blocked) < position(&report, "P1", ActionKind::Ended));
    assert!(
        position(&report, "P1", ActionKind::Ended)
            < position(&report, "P2", ActionKind::AcquiredAfterWait)
    );

    let p1 = report.process("P1").unwrap();
    let p2 = report.process("P2").unwrap();
    assert_eq!((p1.start, p1.finish), (Some(0), Some(2)));
    assert_eq!((p2.start, p2.finish), (Some(0), Some(3)));
    assert_eq!(report.processes[0].name, "P1");
    assert!(report.forced_releases.is_empty());
    assert_mutual_exclusion(&report.actions);
}

#[tokio::test]
async fn test_freed_resource_goes_to_earliest_waiter() {
    let w = workload(&[
        ("P1", &[Allocate(0), Wait(2), End]),
        ("P2", &[Allocate(0), End]),
        ("P3", &[Wait(2), Allocate(0), End]),
    ]);
    let report = run(Policy::Fcfs, 2, &w).await;

    // P3 asks for R0 the moment P1 frees it, but P2 has been queued since t=0
    let grants: Vec<(String, u64)> = report
        .actions
        .iter()
        .filter(|e| e.kind == ActionKind::AcquiredAfterWait)
        .map(|e| (e.process.clone(), e.tick))
        .collect();
    assert_eq!(grants, vec![("P2".into(), 3), ("P3".into(), 4)]);

    let p3_blocked = report
        .actions
        .iter()
        .find(|e| e.process == "P3" && e.kind == ActionKind::Blocked)
        .and_then(|e| e.note.clone());
    assert_eq!(p3_blocked.as_deref(), Some("reserved for P2 [FCFS]"));

    assert_eq!(report.completed(), vec!["P1", "P2", "P3"]);
    assert_mutual_exclusion(&report.actions);
}

#[tokio::test]
async fn test_round_robin_deadlock_is_resolved() {
    let w = workload(&[
        ("P1", &[Allocate(0), Allocate(1), End]),
        ("P2", &[Allocate(1), Allocate(0), End]),
    ]);
    let report = run(Policy::RoundRobin, 1, &w).await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed(), vec!["P1", "P2"]);
    assert_eq!(report.forced_releases.len(), 1);
    assert_eq!(report.forced_releases[0].resource, 0);
    assert_eq!(report.forced_releases[0].previous_owner, "P1");

    let detected: Vec<_> = report
        .actions
        .iter()
        .filter(|e| e.kind == ActionKind::DeadlockDetected)
        .collect();
    assert_eq!(detected.len(), 1);
    assert!(detected[0].is_system());
    assert_eq!(detected[0].note.as_deref(), Some("involving P1, P2"));

    assert_eq!(count(&report, "P2", ActionKind::AcquiredAfterRelease), 1);
    assert!(report.held_resources().is_empty());
    assert_mutual_exclusion(&report.actions);
}

#[tokio::test]
async fn test_fcfs_deadlock_through_waits() {
    let w = workload(&[
        ("P1", &[Allocate(0), Wait(1), Allocate(1), End]),
        ("P2", &[Allocate(1), Wait(1), Allocate(0), End]),
    ]);
    let report = run(Policy::Fcfs, 2, &w).await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.forced_releases.len(), 1);
    assert_eq!(report.elapsed, 2);
    assert_mutual_exclusion(&report.actions);
}

#[tokio::test]
async fn test_instant_allocations_never_deadlock_under_fcfs() {
    let w = workload(&[
        ("P1", &[Allocate(0), Allocate(1), End]),
        ("P2", &[Allocate(1), Allocate(0), End]),
    ]);
    let report = run(Policy::Fcfs, 2, &w).await;

    assert!(report.forced_releases.is_empty());
    assert_eq!(count(&report, "P2", ActionKind::Blocked), 0);
    assert_eq!(report.elapsed, 0);
}

#[tokio::test]
async fn test_sjf_dispatches_shorter_estimate_first() {
    let w = workload(&[("long", &[Wait(5), End]), ("short", &[Wait(1), End])]);

    let report = run(Policy::SjfNonPreemptive, 2, &w).await;
    assert!(position(&report, "short", ActionKind::Started) < position(&report, "long", ActionKind::Started));
    assert_eq!(report.processes[0].name, "short");
    assert_eq!(report.process("long").unwrap().estimated_burst, 5);

    let report = run(Policy::Fcfs, 2, &w).await;
    assert!(position(&report, "long", ActionKind::Started) < position(&report, "short", ActionKind::Started));
}

#[tokio::test]
async fn test_srtf_short_process_finishes_first() {
    let w = workload(&[
        ("long", &[Allocate(0), Wait(4), End]),
        ("short", &[Allocate(1), Wait(1), End]),
    ]);
    let report = run(Policy::SjfPreemptive, 2, &w).await;

    assert_eq!(report.processes[0].name, "short");
    assert_eq!(report.process("short").unwrap().finish, Some(1));
    assert_eq!(report.process("long").unwrap().finish, Some(4));
    assert!(position(&report, "short", ActionKind::Started) < position(&report, "long", ActionKind::Started));
}

#[tokio::test]
async fn test_round_robin_splits_long_waits() {
    let w = workload(&[("P1", &[Wait(5), End]), ("P2", &[Wait(1), End])]);
    let report = run(Policy::RoundRobin, 2, &w).await;

    assert_eq!(count(&report, "P1", ActionKind::Waited), 3);
    assert_eq!(count(&report, "P1", ActionKind::Requeued), 2);
    assert_eq!(report.process("P2").unwrap().finish, Some(3));
    assert_eq!(report.process("P1").unwrap().finish, Some(6));
    assert_eq!(report.elapsed, 6);

    let served: Vec<_> = report
        .actions
        .iter()
        .filter(|e| e.process == "P1" && e.kind == ActionKind::Waited)
        .map(|e| e.note.clone().unwrap_or_default())
        .collect();
    assert_eq!(served, vec!["2 unit(s) [RR]", "2 unit(s) [RR]", "1 unit(s) [RR]"]);
}

#[tokio::test]
async fn test_round_robin_rotates_fairly() {
    let w = workload(&[
        ("P1", &[Wait(3), End]),
        ("P2", &[Wait(3), End]),
        ("P3", &[Wait(3), End]),
    ]);
    let report = run(Policy::RoundRobin, 1, &w).await;

    let started: Vec<(String, u64)> = report
        .actions
        .iter()
        .filter(|e| e.kind == ActionKind::Started)
        .map(|e| (e.process.clone(), e.tick))
        .collect();
    assert_eq!(
        started,
        vec![("P1".into(), 0), ("P2".into(), 1), ("P3".into(), 2)]
    );
    assert_eq!(report.completed(), vec!["P1", "P2", "P3"]);
    assert_eq!(report.elapsed, 9);
}

#[tokio::test]
async fn test_every_policy_releases_everything() {
    let w = workload(&[
        ("P1", &[Allocate(0), Wait(1), Allocate(1), End]),
        ("P2", &[Allocate(1), Wait(1), Allocate(0), End]),
        ("P3", &[Wait(2), Allocate(0), Allocate(2)]),
        ("P4", &[Allocate(2), Wait(3), End]),
    ]);

    for policy in Policy::ALL {
        let report = run(policy, 2, &w).await;
        assert_eq!(report.outcome, RunOutcome::Completed, "{}", policy);
        assert_eq!(report.completed().len(), 4, "{}", policy);
        assert!(report.held_resources().is_empty(), "{}", policy);
        assert!(
            report.processes.iter().all(|p| p.state == ProcessState::Finished),
            "{}",
            policy
        );
        assert_mutual_exclusion(&report.actions);
        assert_turnaround(&report);
    }
}

#[tokio::test]
async fn test_exhausted_program_finishes_without_end() {
    let w = workload(&[("P1", &[Allocate(3), Wait(1)])]);
    let report = run(Policy::Fcfs, 2, &w).await;

    assert_eq!(report.completed(), vec!["P1"]);
    assert_eq!(count(&report, "P1", ActionKind::Released), 1);
    assert!(report.held_resources().is_empty());
}

#[tokio::test]
async fn test_halt_before_run() {
    let (handle, signal) = halt_channel();
    handle.halt();

    let w = workload(&[("P1", &[Wait(1), End])]);
    let report = Scheduler::builder()
        .with_config(SimConfig::instant())
        .with_halt(signal)
        .build()
        .unwrap()
        .run(&w)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Halted);
    assert_eq!(report.process("P1").unwrap().finish, None);
    assert!(report.actions.iter().any(|e| e.kind == ActionKind::Halted));
}

#[tokio::test]
async fn test_halt_interrupts_a_running_wait() {
    let (handle, signal) = halt_channel();
    let w = workload(&[("P1", &[Allocate(0), Wait(1000), End])]);

    let scheduler = Scheduler::builder()
        .with_config(SimConfig::default().with_policy(Policy::RoundRobin).with_quantum(1000))
        .with_time_unit(Duration::from_millis(10))
        .with_halt(signal)
        .build()
        .unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.halt();
    });

    let report = scheduler.run(&w).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Halted);

    let p1 = report.process("P1").unwrap();
    assert_eq!(p1.start, Some(0));
    assert_eq!(p1.finish, None);
    assert_eq!(p1.turnaround, None);
    assert_eq!(report.held_resources(), vec![0]);
}

#[tokio::test]
async fn test_declined_resolution_halts() {
    let w = workload(&[
        ("P1", &[Allocate(0), Allocate(1), End]),
        ("P2", &[Allocate(1), Allocate(0), End]),
    ]);
    let report = Scheduler::builder()
        .with_config(SimConfig::instant().with_policy(Policy::RoundRobin).with_quantum(1))
        .with_resolver(Abandon)
        .build()
        .unwrap()
        .run(&w)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Halted);
    assert!(report.completed().is_empty());
    assert_eq!(report.held_resources(), vec![0, 1]);
    assert!(report.forced_releases.is_empty());
}

#[tokio::test]
async fn test_workload_checked_against_pool_size() {
    let w = workload(&[("P1", &[Allocate(7), End])]);
    let result = Scheduler::builder()
        .with_config(SimConfig::instant().with_pool_size(4))
        .build()
        .unwrap()
        .run(&w)
        .await;

    assert!(matches!(result, Err(pseudo_os_sim::SimError::Load(_))));
}
