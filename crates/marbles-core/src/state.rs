//! Behavioral states a marble moves through.
//!
//! A marble holds exactly one [`State`] at a time. Each iteration of a tick
//! asks the current state for its successor given the symbol under the
//! marble, installs the successor, and runs the successor's effect on the
//! marble's [`Body`].
//!
//! [`Dead`] and [`Traveling`] are built in. Operator symbols add their own
//! states through [`Operators`].

use std::fmt;

use crate::error::OperatorFailure;
use crate::marble::Body;
use crate::operators::Operators;

/// Capability set every marble state implements.
pub trait State: fmt::Debug + Send {
    /// Short name used in logs and snapshots.
    fn name(&self) -> &'static str;

    /// Successor state for the symbol the marble now stands on.
    fn next(self: Box<Self>, ch: char, operators: &Operators) -> Box<dyn State>;

    /// Applies this state's effect to the marble.
    fn run(&mut self, ch: char, body: &mut Body) -> Result<(), OperatorFailure>;

    fn is_dead(&self) -> bool {
        false
    }

    /// Whether the marble must yield to the scheduler in this state.
    fn is_waiting(&self) -> bool {
        false
    }
}

/// Successor shared by every non-terminal built-in state: the operator
/// registered for `ch`, or plain traveling.
pub fn follow(ch: char, operators: &Operators) -> Box<dyn State> {
    operators
        .resolve(ch)
        .unwrap_or_else(|| Box::new(Traveling))
}

/// Default mode: keep moving in the current heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Traveling;

impl State for Traveling {
    fn name(&self) -> &'static str {
        "traveling"
    }

    fn next(self: Box<Self>, ch: char, operators: &Operators) -> Box<dyn State> {
        match operators.resolve(ch) {
            Some(state) => state,
            None => self,
        }
    }

    fn run(&mut self, _ch: char, body: &mut Body) -> Result<(), OperatorFailure> {
        body.advance();
        Ok(())
    }
}

/// Terminal state. Nothing leaves it and nothing it does touches the marble.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dead;

impl State for Dead {
    fn name(&self) -> &'static str {
        "dead"
    }

    fn next(self: Box<Self>, _ch: char, _operators: &Operators) -> Box<dyn State> {
        self
    }

    fn run(&mut self, _ch: char, _body: &mut Body) -> Result<(), OperatorFailure> {
        Ok(())
    }

    fn is_dead(&self) -> bool {
        true
    }
}
