/*!
 * Operator Resolution Interface
 * Boundary between the coordinator and whoever picks the resource to revoke
 */

use crate::core::errors::ResolutionError;
use crate::core::types::{ProcessName, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// What the operator is shown when a deadlock is detected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    /// Processes on the detected cycle
    pub participants: Vec<ProcessName>,
    /// Resources the operator may pick
    pub candidates: Vec<ResourceId>,
    /// Every currently owned resource and its owner
    pub ownership: Vec<(ResourceId, ProcessName)>,
    /// Resources each blocked process is queued on
    pub waiting: BTreeMap<ProcessName, Vec<ResourceId>>,
    /// 1 on the first prompt, incremented on every rejected answer
    pub attempt: u32,
    /// Why the previous answer was refused
    pub rejection: Option<ResolutionError>,
}

/// Chooses the resource to force-release when a deadlock is detected
///
/// Returning `None` abandons the run, with the same effect as an external halt.
pub trait DeadlockResolver: Send {
    fn choose(&mut self, request: &ResolutionRequest) -> Option<ResourceId>;
}

impl<F> DeadlockResolver for F
where
    F: FnMut(&ResolutionRequest) -> Option<ResourceId> + Send,
{
    fn choose(&mut self, request: &ResolutionRequest) -> Option<ResourceId> {
        self(request)
    }
}

/// Always picks the smallest candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestCandidate;

impl DeadlockResolver for LowestCandidate {
    fn choose(&mut self, request: &ResolutionRequest) -> Option<ResourceId> {
        request.candidates.iter().min().copied()
    }
}

/// Replays a fixed list of answers, then gives up
#[derive(Debug, Clone, Default)]
pub struct ScriptedResolver {
    answers: VecDeque<ResourceId>,
    requests: Vec<ResolutionRequest>,
}

impl ScriptedResolver {
    pub fn new(answers: impl IntoIterator<Item = ResourceId>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            requests: Vec::new(),
        }
    }

    /// Every request received so far
    pub fn requests(&self) -> &[ResolutionRequest] {
        &self.requests
    }
}

impl DeadlockResolver for ScriptedResolver {
    fn choose(&mut self, request: &ResolutionRequest) -> Option<ResourceId> {
        self.requests.push(request.clone());
        self.answers.pop_front()
    }
}

/// Refuses every deadlock; the run is abandoned on the first one
#[derive(Debug, Clone, Copy, Default)]
pub struct Abandon;

impl DeadlockResolver for Abandon {
    fn choose(&mut self, _request: &ResolutionRequest) -> Option<ResourceId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(candidates: Vec<ResourceId>) -> ResolutionRequest {
        ResolutionRequest {
            participants: vec!["P1".into(), "P2".into()],
            candidates,
            ownership: vec![],
            waiting: BTreeMap::new(),
            attempt: 1,
            rejection: None,
        }
    }

    #[test]
    fn test_lowest_candidate() {
        assert_eq!(LowestCandidate.choose(&request(vec![4, 1, 3])), Some(1));
        assert_eq!(LowestCandidate.choose(&request(vec![])), None);
    }

    #[test]
    fn test_scripted_answers_then_gives_up() {
        let mut resolver = ScriptedResolver::new([2, 0]);
        assert_eq!(resolver.choose(&request(vec![0])), Some(2));
        assert_eq!(resolver.choose(&request(vec![0])), Some(0));
        assert_eq!(resolver.choose(&request(vec![0])), None);
        assert_eq!(resolver.requests().len(), 3);
    }

    #[test]
    fn test_closures_are_resolvers() {
        let mut pick_last = |r: &ResolutionRequest| r.candidates.last().copied();
        assert_eq!(pick_last.choose(&request(vec![5, 6])), Some(6));
    }
}
