/*!
 * Deadlock Detector
 * Wait-for graph construction and cycle search over a resource snapshot
 *
 * The graph is rebuilt from every snapshot and never cached. Nodes and edges
 * are kept in ordered maps, so both the verdict and the reported cycle are a
 * function of the snapshot alone.
 */

use crate::core::types::{ProcessName, ResourceId};
use crate::resources::ResourceSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A cycle in the wait-for graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Participants in edge order: each waits on a resource held by the next
    pub processes: Vec<ProcessName>,
    /// Resources on the cycle's edges, ascending
    pub resources: Vec<ResourceId>,
}

impl Cycle {
    pub fn contains(&self, process: &str) -> bool {
        self.processes.iter().any(|p| p == process)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

struct Frame<'a> {
    node: &'a str,
    successors: Vec<&'a str>,
    cursor: usize,
}

/// Directed graph: P -> Q when P waits on a resource Q owns
#[derive(Debug, Clone, Default)]
pub struct WaitForGraph {
    edges: BTreeMap<ProcessName, BTreeMap<ProcessName, BTreeSet<ResourceId>>>,
}

impl WaitForGraph {
    pub fn from_snapshot(snapshot: &ResourceSnapshot) -> Self {
        let mut edges: BTreeMap<ProcessName, BTreeMap<ProcessName, BTreeSet<ResourceId>>> =
            BTreeMap::new();

        for (waiter, resources) in &snapshot.waiting {
            for &resource in resources {
                if let Some(owner) = snapshot.owner(resource) {
                    edges
                        .entry(waiter.clone())
                        .or_default()
                        .entry(owner.to_string())
                        .or_default()
                        .insert(resource);
                }
            }
        }

        Self { edges }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    fn successors(&self, node: &str) -> Vec<&str> {
        self.edges
            .get(node)
            .map(|targets| targets.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Iterative three-colour depth-first search, O(V + E)
    pub fn find_cycle(&self) -> Option<Cycle> {
        let mut color: BTreeMap<&str, Color> = BTreeMap::new();

        for start in self.edges.keys() {
            if color.get(start.as_str()).copied().unwrap_or(Color::White) != Color::White {
                continue;
            }

            color.insert(start, Color::Gray);
            let mut stack = vec![Frame {
                node: start,
                successors: self.successors(start),
                cursor: 0,
            }];

            while let Some(frame) = stack.last_mut() {
                let node = frame.node;
                let next = frame.successors.get(frame.cursor).copied();
                frame.cursor += 1;

                let Some(next) = next else {
                    color.insert(node, Color::Black);
                    stack.pop();
                    continue;
                };

                match color.get(next).copied().unwrap_or(Color::White) {
                    Color::White => {
                        color.insert(next, Color::Gray);
                        stack.push(Frame {
                            node: next,
                            successors: self.successors(next),
                            cursor: 0,
                        });
                    }
                    Color::Gray => {
                        if let Some(pos) = stack.iter().position(|f| f.node == next) {
                            let processes = stack[pos..].iter().map(|f| f.node.to_string()).collect();
                            return Some(self.cycle_through(processes));
                        }
                    }
                    Color::Black => {}
                }
            }
        }

        None
    }

    fn cycle_through(&self, processes: Vec<ProcessName>) -> Cycle {
        let mut resources = BTreeSet::new();
        for (i, from) in processes.iter().enumerate() {
            let to = &processes[(i + 1) % processes.len()];
            if let Some(held) = self.edges.get(from).and_then(|t| t.get(to)) {
                resources.extend(held.iter().copied());
            }
        }
        Cycle {
            processes,
            resources: resources.into_iter().collect(),
        }
    }
}

/// Find a cycle in the snapshot's wait-for graph
pub fn find_cycle(snapshot: &ResourceSnapshot) -> Option<Cycle> {
    WaitForGraph::from_snapshot(snapshot).find_cycle()
}

/// True iff the snapshot's wait-for graph has a cycle
pub fn has_cycle(snapshot: &ResourceSnapshot) -> bool {
    find_cycle(snapshot).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(owners: &[Option<&str>], waiting: &[(&str, &[ResourceId])]) -> ResourceSnapshot {
        ResourceSnapshot::from_parts(
            owners.iter().map(|o| o.map(str::to_string)).collect(),
            waiting
                .iter()
                .map(|(p, r)| (p.to_string(), r.to_vec()))
                .collect(),
        )
    }

    #[test]
    fn test_empty_snapshot_has_no_cycle() {
        assert!(!has_cycle(&ResourceSnapshot::default()));
    }

    #[test]
    fn test_chain_is_not_a_cycle() {
        // P1 -> P2 -> P3
        let s = snapshot(
            &[Some("P2"), Some("P3"), None],
            &[("P1", &[0]), ("P2", &[1])],
        );
        assert!(!has_cycle(&s));
        assert_eq!(WaitForGraph::from_snapshot(&s).edge_count(), 2);
    }

    #[test]
    fn test_two_process_cycle() {
        let s = snapshot(&[Some("P1"), Some("P2")], &[("P1", &[1]), ("P2", &[0])]);
        let cycle = find_cycle(&s).unwrap();
        assert_eq!(cycle.processes, vec!["P1".to_string(), "P2".to_string()]);
        assert_eq!(cycle.resources, vec![0, 1]);
    }

    #[test]
    fn test_self_wait_is_a_cycle() {
        let s = snapshot(&[Some("P1")], &[("P1", &[0])]);
        let cycle = find_cycle(&s).unwrap();
        assert_eq!(cycle.processes, vec!["P1".to_string()]);
        assert_eq!(cycle.resources, vec![0]);
    }

    #[test]
    fn test_cycle_behind_a_tail() {
        // A -> B -> C -> B
        let s = snapshot(
            &[Some("B"), Some("C"), Some("B")],
            &[("A", &[0]), ("B", &[1]), ("C", &[2])],
        );
        let cycle = find_cycle(&s).unwrap();
        assert!(cycle.contains("B") && cycle.contains("C"));
        assert!(!cycle.contains("A"));
        assert_eq!(cycle.resources, vec![1, 2]);
    }

    #[test]
    fn test_waiting_on_free_resource_adds_no_edge() {
        let s = snapshot(&[None, Some("P1")], &[("P1", &[0]), ("P2", &[1])]);
        assert!(!has_cycle(&s));
    }
}
