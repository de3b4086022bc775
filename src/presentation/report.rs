/*!
 * Report Rendering
 * Plain-text tables and JSON for a finished run
 */

use crate::monitoring::ActionEntry;
use crate::resources::ResourceSnapshot;
use crate::scheduler::{RunOutcome, SimulationReport};
use crate::core::types::Tick;
use std::fmt::Write as _;

fn cell(value: Option<Tick>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// One action log line: `[t=  3] P2       acquired after wait R0 [FCFS]`
pub fn format_action(entry: &ActionEntry) -> String {
    let mut line = format!("[t={:>3}] {:<8} {}", entry.tick, entry.process, entry.kind);
    if let Some(resource) = entry.resource {
        let _ = write!(line, " R{}", resource);
    }
    if let Some(note) = &entry.note {
        let _ = write!(line, " {}", note);
    }
    line
}

pub fn render_actions(entries: &[ActionEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format_action(entry));
        out.push('\n');
    }
    out
}

/// Process table in completion order
pub fn render_process_table(report: &SimulationReport) -> String {
    let mut out = format!(
        "{:<10} {:<9} {:>6} {:>7} {:>11} {:>6}\n",
        "Process", "State", "Start", "Finish", "Turnaround", "Burst"
    );
    for row in &report.processes {
        let _ = writeln!(
            out,
            "{:<10} {:<9} {:>6} {:>7} {:>11} {:>6}",
            row.name,
            row.state,
            cell(row.start),
            cell(row.finish),
            cell(row.turnaround),
            row.estimated_burst
        );
    }
    out
}

/// Ownership table of a live or final snapshot
pub fn render_resources(snapshot: &ResourceSnapshot) -> String {
    let mut out = format!("{:<9} {:<10} {}\n", "Resource", "Owner", "Waiting");
    for (id, owner) in snapshot.owners.iter().enumerate() {
        let waiting = snapshot
            .queues
            .get(id)
            .map(|q| q.join(", "))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<9} {:<10} {}",
            format!("R{}", id),
            owner.as_deref().unwrap_or("-"),
            waiting
        );
    }
    out
}

/// Mean turnaround of finished processes
pub fn average_turnaround(report: &SimulationReport) -> Option<f64> {
    let values: Vec<Tick> = report.processes.iter().filter_map(|p| p.turnaround).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<Tick>() as f64 / values.len() as f64)
}

pub fn render_summary(report: &SimulationReport) -> String {
    let mut out = String::new();
    let outcome = match report.outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Halted => "halted",
    };
    let _ = writeln!(out, "Policy:          {}", report.policy);
    let _ = writeln!(out, "Outcome:         {}", outcome);
    let _ = writeln!(out, "Elapsed:         {} unit(s)", report.elapsed);
    let _ = writeln!(
        out,
        "Finished:        {}/{}",
        report.completed().len(),
        report.processes.len()
    );
    if let Some(avg) = average_turnaround(report) {
        let _ = writeln!(out, "Avg turnaround:  {:.2}", avg);
    }
    for forced in &report.forced_releases {
        let _ = writeln!(
            out,
            "Forced release:  R{} from {}",
            forced.resource, forced.previous_owner
        );
    }
    let held = report.held_resources();
    if !held.is_empty() {
        let held: Vec<String> = held.iter().map(|r| format!("R{}", r)).collect();
        let _ = writeln!(out, "Still held:      {}", held.join(", "));
    }
    out
}

/// Full text report: action log, process table, summary
pub fn render_report(report: &SimulationReport) -> String {
    format!(
        "== Action log ==\n{}\n== Processes ==\n{}\n== Summary ==\n{}",
        render_actions(&report.actions),
        render_process_table(report),
        render_summary(report)
    )
}

pub fn to_json(report: &SimulationReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::ActionKind;
    use crate::process::{ProcessRecord, ProcessState};
    use crate::resources::ForcedRelease;
    use crate::scheduler::Policy;
    use time::OffsetDateTime;

    fn report() -> SimulationReport {
        SimulationReport {
            policy: Policy::RoundRobin,
            outcome: RunOutcome::Completed,
            elapsed: 4,
            processes: vec![
                ProcessRecord {
                    name: "P2".into(),
                    state: ProcessState::Finished,
                    start: Some(0),
                    finish: Some(2),
                    turnaround: Some(2),
                    estimated_burst: 2,
                },
                ProcessRecord {
                    name: "P1".into(),
                    state: ProcessState::Finished,
                    start: Some(0),
                    finish: Some(4),
                    turnaround: Some(4),
                    estimated_burst: 3,
                },
            ],
            actions: vec![ActionEntry {
                tick: 3,
                wall: OffsetDateTime::UNIX_EPOCH,
                process: "P2".into(),
                kind: ActionKind::AcquiredAfterWait,
                resource: Some(0),
                note: Some("[RR]".into()),
            }],
            forced_releases: vec![ForcedRelease {
                resource: 0,
                previous_owner: "P1".into(),
            }],
            final_ownership: vec![None, None],
        }
    }

    #[test]
    fn test_action_line() {
        let report = report();
        assert_eq!(
            format_action(&report.actions[0]),
            "[t=  3] P2       acquired after wait R0 [RR]"
        );
    }

    #[test]
    fn test_summary() {
        let summary = render_summary(&report());
        assert!(summary.contains("Policy:          round-robin"));
        assert!(summary.contains("Finished:        2/2"));
        assert!(summary.contains("Avg turnaround:  3.00"));
        assert!(summary.contains("Forced release:  R0 from P1"));
        assert!(!summary.contains("Still held"));
    }

    #[test]
    fn test_table_keeps_completion_order() {
        let table = render_process_table(&report());
        let p2 = table.find("P2").unwrap();
        let p1 = table.find("P1").unwrap();
        assert!(p2 < p1);
        assert!(table.contains("FINISHED"));
    }

    #[test]
    fn test_json_round_trip() {
        let json = to_json(&report()).unwrap();
        let parsed: SimulationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.processes, report().processes);
        assert_eq!(parsed.policy, Policy::RoundRobin);
    }
}
