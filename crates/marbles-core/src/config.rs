//! Simulation settings.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Settings for a [`Scheduler`](crate::Scheduler) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Mode passed to every tick: run each marble until it waits, or one
    /// step at a time.
    #[serde(default = "default_true")]
    pub run_until_waiting: bool,
    /// Stop after this many scheduler rounds.
    #[serde(default)]
    pub max_rounds: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            run_until_waiting: true,
            max_rounds: None,
        }
    }
}

impl SimulationConfig {
    /// Loads a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the configuration to a JSON string.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Single-step mode, useful for watching a program cell by cell.
    pub fn stepping() -> Self {
        Self {
            run_until_waiting: false,
            ..Self::default()
        }
    }

    pub fn with_max_rounds(mut self, rounds: u64) -> Self {
        self.max_rounds = Some(rounds);
        self
    }
}
