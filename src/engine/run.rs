use serde::Serialize;
use std::fmt;

/// Identifier of one search run, increasing with every new search
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RunId(u64);

impl RunId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Starting,
    CandidatesFetched,
    PricingFetched,
    Settled,
    Failed,
    Superseded,
}

impl RunPhase {
    fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Starting => 1,
            Self::CandidatesFetched => 2,
            Self::PricingFetched => 3,
            Self::Settled | Self::Failed => 4,
            Self::Superseded => 5,
        }
    }
}

/// Generation counter guarding every asynchronous commit
///
/// Only the newest run may write shared state. Requests of older runs are
/// left to finish; their results are dropped at the commit point.
#[derive(Debug)]
pub struct SearchRunController {
    current: u64,
    phase: RunPhase,
}

impl Default for SearchRunController {
    fn default() -> Self {
        Self {
            current: 0,
            phase: RunPhase::Idle,
        }
    }
}

impl SearchRunController {
    /// Allocate the next run, superseding whatever was current
    pub fn start(&mut self) -> RunId {
        self.current += 1;
        self.phase = RunPhase::Starting;
        RunId(self.current)
    }

    pub fn current(&self) -> Option<RunId> {
        (self.current > 0).then_some(RunId(self.current))
    }

    pub fn is_current(&self, run: RunId) -> bool {
        run.0 == self.current
    }

    pub fn phase(&self, run: RunId) -> RunPhase {
        if self.is_current(run) {
            self.phase
        } else if run.0 < self.current {
            RunPhase::Superseded
        } else {
            RunPhase::Idle
        }
    }

    /// Check-then-advance at a commit point. Returns false for a stale run, in
    /// which case the caller must drop its results. Phases only move forward
    pub fn advance(&mut self, run: RunId, next: RunPhase) -> bool {
        if !self.is_current(run) {
            return false;
        }
        if next.rank() > self.phase.rank() {
            self.phase = next;
        }
        true
    }
}
