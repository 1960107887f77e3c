//! Run report
//!
//! Summary of a completed run. Only exists at runtime; nothing is persisted
//! or sent anywhere.

use chrono::{DateTime, Utc};

use crate::phase::Phase;

/// What a successful run did
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    /// Set once every phase has completed
    pub finished_at: Option<DateTime<Utc>>,
    /// Phases in the order they completed
    pub phases_completed: Vec<Phase>,
    /// Shell commands executed across all phases
    pub commands_executed: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            phases_completed: Vec::new(),
            commands_executed: 0,
        }
    }

    /// Record a completed phase and the number of commands it ran
    pub fn record_phase(&mut self, phase: Phase, commands: usize) {
        self.phases_completed.push(phase);
        self.commands_executed += commands;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock time of the run, `None` until finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|finished| finished - self.started_at)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
