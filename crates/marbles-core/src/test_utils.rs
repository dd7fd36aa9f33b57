//! Fixtures shared by the unit tests.

use std::sync::Arc;

use crate::environment::Environment;
use crate::error::OperatorFailure;
use crate::marble::Body;
use crate::notify::{EventLog, NullNotifier};
use crate::operators::Operators;
use crate::state::State;
use crate::vector::Pos;
use crate::world::{Grid, World};

/// Environment over `grid` whose notifications land in the returned log.
pub(crate) fn env_with_log(grid: &str) -> (Arc<Environment>, Arc<EventLog>) {
    let log = Arc::new(EventLog::new());
    let env = Environment::new(Grid::from_text(grid), log.clone());
    (Arc::new(env), log)
}

/// Grid that refuses lookups at coordinates that do not exist.
pub(crate) struct StrictWorld(Grid);

impl StrictWorld {
    pub fn env(grid: &str) -> Arc<Environment> {
        Arc::new(Environment::new(
            StrictWorld(Grid::from_text(grid)),
            Arc::new(NullNotifier),
        ))
    }
}

impl World for StrictWorld {
    fn exists(&self, pos: Pos) -> bool {
        self.0.exists(pos)
    }

    fn char_at(&self, pos: Pos) -> Option<char> {
        assert!(self.0.exists(pos), "lookup at nonexistent cell {pos}");
        self.0.char_at(pos)
    }
}

/// Never moves and never changes.
#[derive(Debug)]
pub(crate) struct Spin;

impl State for Spin {
    fn name(&self) -> &'static str {
        "spin"
    }

    fn next(self: Box<Self>, _ch: char, _operators: &Operators) -> Box<dyn State> {
        self
    }

    fn run(&mut self, _ch: char, _body: &mut Body) -> Result<(), OperatorFailure> {
        Ok(())
    }
}

/// Moves forward while counting down; waits in place once the count is spent.
#[derive(Debug)]
pub(crate) struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn new(remaining: u32) -> Self {
        Self { remaining }
    }
}

impl State for Countdown {
    fn name(&self) -> &'static str {
        "countdown"
    }

    fn next(self: Box<Self>, _ch: char, _operators: &Operators) -> Box<dyn State> {
        Box::new(Countdown::new(self.remaining.saturating_sub(1)))
    }

    fn run(&mut self, _ch: char, body: &mut Body) -> Result<(), OperatorFailure> {
        if !self.is_waiting() {
            body.advance();
        }
        Ok(())
    }

    fn is_waiting(&self) -> bool {
        self.remaining == 0
    }
}

/// Fails on every run.
#[derive(Debug)]
pub(crate) struct Failing;

impl State for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn next(self: Box<Self>, _ch: char, _operators: &Operators) -> Box<dyn State> {
        self
    }

    fn run(&mut self, _ch: char, _body: &mut Body) -> Result<(), OperatorFailure> {
        Err("boom".into())
    }
}
