use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use url::Url;

use crate::frontier::Frontier;

/// Admission gate in front of the frontier.
///
/// The seen-set and the budget live behind one lock and `admit` is the
/// only path into the frontier, so two workers discovering the same
/// address cannot both queue it and the budget can never overshoot.
pub(crate) struct Gate {
    frontier: Arc<Frontier>,
    limit: usize,
    state: Mutex<GateState>,
}

struct GateState {
    seen: HashSet<Url>,
    admitted: usize,
}

impl Gate {
    pub fn new(limit: usize, frontier: Arc<Frontier>) -> Self {
        Self {
            frontier,
            limit,
            state: Mutex::new(GateState {
                seen: HashSet::new(),
                admitted: 0,
            }),
        }
    }

    /// Records novel candidates as seen and queues them while budget
    /// remains, preserving input order. Returns the addresses actually
    /// queued. Candidates seen before, or novel ones arriving over
    /// budget, are dropped; over-budget ones still count as seen so the
    /// run report can list them.
    pub fn admit(&self, candidates: Vec<Url>) -> Vec<Url> {
        let mut state = self.state.lock().unwrap();
        let mut accepted = Vec::new();
        let mut over_budget = 0;
        for url in candidates {
            if !state.seen.insert(url.clone()) {
                continue;
            }
            if state.admitted >= self.limit {
                over_budget += 1;
                continue;
            }
            state.admitted += 1;
            self.frontier.push(url.clone());
            accepted.push(url);
        }
        if over_budget > 0 {
            log::debug!(
                "admission budget of {} exhausted, dropped {over_budget} new address(es)",
                self.limit
            );
        }
        accepted
    }

    /// Number of addresses that have entered the frontier so far.
    pub fn admitted(&self) -> usize {
        self.state.lock().unwrap().admitted
    }

    /// Snapshot of every address ever recorded, queued or not.
    pub fn seen(&self) -> HashSet<Url> {
        self.state.lock().unwrap().seen.clone()
    }
}
