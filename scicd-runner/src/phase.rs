//! Phase state machine
//!
//! A run walks a fixed, ordered list of phases. Each phase must succeed
//! before the next starts, and there is no way to skip one.

use std::fmt;

/// One stage of the build pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Build,
    Artifacts,
    Finalize,
}

impl Phase {
    /// Execution order
    pub const ORDER: [Phase; 3] = [Phase::Build, Phase::Artifacts, Phase::Finalize];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Build => "Build",
            Phase::Artifacts => "Artifacts",
            Phase::Finalize => "Finalize",
        }
    }

    /// The phase that follows this one, if any
    pub fn next(self) -> Option<Phase> {
        let position = Self::ORDER.iter().position(|phase| *phase == self)?;
        Self::ORDER.get(position + 1).copied()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// The phase is next to execute
    Pending(Phase),
    /// Every phase succeeded
    Done,
}

impl RunState {
    /// State of a run that has not started
    pub fn start() -> Self {
        RunState::Pending(Phase::ORDER[0])
    }

    /// State after the current phase succeeded
    pub fn advance(self) -> Self {
        match self {
            RunState::Pending(phase) => phase.next().map_or(RunState::Done, RunState::Pending),
            RunState::Done => RunState::Done,
        }
    }
}
