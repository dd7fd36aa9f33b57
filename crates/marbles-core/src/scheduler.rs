//! Cooperative round-robin scheduler over the live marbles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::environment::Environment;
use crate::error::EngineError;
use crate::marble::{Marble, MarbleId, MarbleOptions, MarbleSnapshot, TickOutcome};
use crate::vector::Pos;

/// State of the scheduler after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerStatus {
    /// Live marbles remain.
    Running,
    /// A marble reached the halt symbol.
    Halted,
    /// Every marble is dead.
    Exhausted,
}

/// Why [`Scheduler::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEnd {
    Halted,
    Exhausted,
    RoundLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub rounds: u64,
    pub end: RunEnd,
}

/// Owns the live marbles of one environment and gives each a turn per round.
#[derive(Debug)]
pub struct Scheduler {
    env: Arc<Environment>,
    config: SimulationConfig,
    marbles: Vec<Marble>,
    /// `None` once every id has been handed out.
    next_id: Option<MarbleId>,
    rounds: u64,
}

impl Scheduler {
    pub fn new(env: Arc<Environment>, config: SimulationConfig) -> Self {
        Self {
            env,
            config,
            marbles: Vec::new(),
            next_id: Some(0),
            rounds: 0,
        }
    }

    /// Spawns a marble in this scheduler's environment. Marbles without an
    /// explicit id get the next free one.
    pub fn spawn(
        &mut self,
        position: Pos,
        mut options: MarbleOptions,
    ) -> Result<MarbleId, EngineError> {
        let id = match options.id {
            Some(id) => id,
            None => self.next_id.ok_or(EngineError::IdsExhausted)?,
        };
        options.id = Some(id);
        self.reserve_id(id);

        let marble = Marble::spawn(Arc::clone(&self.env), position, options);
        self.marbles.push(marble);
        Ok(id)
    }

    /// Takes over a marble built elsewhere. It must share this scheduler's
    /// environment, otherwise its halt would go unnoticed here.
    pub fn adopt(&mut self, marble: Marble) -> Result<(), EngineError> {
        if !Arc::ptr_eq(marble.environment(), &self.env) {
            return Err(EngineError::ForeignEnvironment { id: marble.id() });
        }
        self.reserve_id(marble.id());
        self.marbles.push(marble);
        Ok(())
    }

    /// Moves the id counter past `id`. `None` once `MarbleId::MAX` is taken.
    fn reserve_id(&mut self, id: MarbleId) {
        if self.next_id.is_some_and(|next| next <= id) {
            self.next_id = id.checked_add(1);
        }
    }

    /// Gives every live marble one tick, in spawn order, then drops the dead.
    ///
    /// A halt stops the round immediately; no marble after the halting one
    /// is advanced. An operator failure also ends the round early, after
    /// the dead have been dropped.
    pub fn tick(&mut self) -> Result<SchedulerStatus, EngineError> {
        if self.env.is_halted() {
            return Ok(SchedulerStatus::Halted);
        }
        if self.marbles.is_empty() {
            return Ok(SchedulerStatus::Exhausted);
        }

        self.rounds += 1;
        let mut failure = None;
        for marble in &mut self.marbles {
            match marble.simulate_tick(self.config.run_until_waiting) {
                Ok(TickOutcome::Halted) => {
                    tracing::info!(
                        "[scheduler] Halted by marble={} in round {}",
                        marble.id(),
                        self.rounds
                    );
                    return Ok(SchedulerStatus::Halted);
                }
                Ok(_) => {}
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        self.marbles.retain(|marble| {
            if marble.is_dead() {
                tracing::debug!("[scheduler] Removing dead marble={}", marble.id());
            }
            !marble.is_dead()
        });

        if let Some(err) = failure {
            return Err(err);
        }
        if self.marbles.is_empty() {
            Ok(SchedulerStatus::Exhausted)
        } else {
            Ok(SchedulerStatus::Running)
        }
    }

    /// Runs rounds until the program halts, every marble is dead, or the
    /// configured round limit is reached.
    pub fn run(&mut self) -> Result<RunReport, EngineError> {
        let end = loop {
            if self
                .config
                .max_rounds
                .is_some_and(|max| self.rounds >= max)
            {
                break RunEnd::RoundLimit;
            }
            match self.tick()? {
                SchedulerStatus::Running => {}
                SchedulerStatus::Halted => break RunEnd::Halted,
                SchedulerStatus::Exhausted => break RunEnd::Exhausted,
            }
        };

        tracing::info!("[scheduler] Run ended after {} rounds: {end:?}", self.rounds);
        Ok(RunReport {
            rounds: self.rounds,
            end,
        })
    }

    pub fn marbles(&self) -> &[Marble] {
        &self.marbles
    }

    pub fn get_marble(&self, id: MarbleId) -> Option<&Marble> {
        self.marbles.iter().find(|m| m.id() == id)
    }

    pub fn live_count(&self) -> usize {
        self.marbles.iter().filter(|m| !m.is_dead()).count()
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn is_halted(&self) -> bool {
        self.env.is_halted()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn snapshots(&self) -> Vec<MarbleSnapshot> {
        self.marbles.iter().map(Marble::snapshot).collect()
    }
}
