//! Shared collaborators every marble of one simulation refers to.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::notify::Notifier;
use crate::operators::Operators;
use crate::world::World;

/// World, notification sink and operator registry of one simulation.
///
/// Marbles hold it behind an `Arc`, so independent simulations never share
/// anything.
pub struct Environment {
    world: Box<dyn World>,
    notifier: Arc<dyn Notifier>,
    operators: Operators,
    halted: AtomicBool,
}

impl Environment {
    /// Creates an environment with the built-in operators.
    pub fn new(world: impl World + 'static, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            world: Box::new(world),
            notifier,
            operators: Operators::default(),
            halted: AtomicBool::new(false),
        }
    }

    /// Replaces the operator registry.
    pub fn with_operators(mut self, operators: Operators) -> Self {
        self.operators = operators;
        self
    }

    pub fn world(&self) -> &dyn World {
        self.world.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn operators(&self) -> &Operators {
        &self.operators
    }

    /// Whether a marble has reached the halt symbol.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Stops the simulation. Returns false if it was already halted.
    pub(crate) fn halt(&self) -> bool {
        !self.halted.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("operators", &self.operators)
            .field("halted", &self.is_halted())
            .finish_non_exhaustive()
    }
}
