/*!
 * Run Invariants
 * Checks replayed from a finished run's action log
 */

#![allow(dead_code)]

use pseudo_os_sim::{ActionEntry, ActionKind};
use std::collections::BTreeMap;

/// Replays the log; no resource may ever have two owners, and nothing stays held
pub fn check_mutual_exclusion(actions: &[ActionEntry]) -> Result<(), String> {
    let mut owners: BTreeMap<usize, String> = BTreeMap::new();
    for entry in actions {
        let Some(resource) = entry.resource else {
            continue;
        };
        match entry.kind {
            ActionKind::Allocated | ActionKind::AcquiredAfterWait | ActionKind::AcquiredAfterRelease => {
                if let Some(owner) = owners.insert(resource, entry.process.clone()) {
                    return Err(format!(
                        "R{} granted to {} at t={} while held by {}",
                        resource, entry.process, entry.tick, owner
                    ));
                }
            }
            ActionKind::Released | ActionKind::ForceReleased => {
                owners.remove(&resource);
            }
            _ => {}
        }
    }
    if owners.is_empty() {
        Ok(())
    } else {
        Err(format!("resources left held: {:?}", owners))
    }
}

pub fn assert_mutual_exclusion(actions: &[ActionEntry]) {
    if let Err(violation) = check_mutual_exclusion(actions) {
        panic!("{}", violation);
    }
}
