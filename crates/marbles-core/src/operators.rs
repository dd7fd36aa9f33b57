//! Operator registry and the built-in steering operators.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::OperatorFailure;
use crate::marble::Body;
use crate::state::{State, Traveling, follow};
use crate::vector::Direction;

/// Builds the state a marble enters when it lands on an operator symbol.
pub type OperatorFactory = Arc<dyn Fn(char) -> Box<dyn State> + Send + Sync>;

/// Maps operator symbols to the states that implement them.
#[derive(Clone)]
pub struct Operators {
    table: HashMap<char, OperatorFactory>,
}

impl Default for Operators {
    fn default() -> Self {
        let mut operators = Self::empty();
        for symbol in ['^', 'v', '<', '>'] {
            operators.register(symbol, |ch| match Redirect::from_symbol(ch) {
                Some(redirect) => Box::new(redirect) as Box<dyn State>,
                None => Box::new(Traveling),
            });
        }
        operators.register('/', |_| Box::new(Mirror::Slash));
        operators.register('\\', |_| Box::new(Mirror::Backslash));
        operators
    }
}

impl Operators {
    /// Registry with no operators at all.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Registers (or replaces) the state factory for `symbol`.
    pub fn register<F>(&mut self, symbol: char, factory: F) -> &mut Self
    where
        F: Fn(char) -> Box<dyn State> + Send + Sync + 'static,
    {
        self.table.insert(symbol, Arc::new(factory));
        self
    }

    /// Removes the operator for `symbol`. Returns false if none was registered.
    pub fn unregister(&mut self, symbol: char) -> bool {
        self.table.remove(&symbol).is_some()
    }

    /// Fresh state for `ch`, if it is an operator symbol.
    pub fn resolve(&self, ch: char) -> Option<Box<dyn State>> {
        self.table.get(&ch).map(|factory| factory(ch))
    }

    pub fn contains(&self, ch: char) -> bool {
        self.table.contains_key(&ch)
    }

    /// Registered symbols, sorted.
    pub fn symbols(&self) -> Vec<char> {
        let mut symbols: Vec<char> = self.table.keys().copied().collect();
        symbols.sort_unstable();
        symbols
    }
}

impl fmt::Debug for Operators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operators")
            .field("symbols", &self.symbols())
            .finish()
    }
}

/// Arrow operator: points the marble in the arrow's direction, then moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub heading: Direction,
}

impl Redirect {
    pub fn from_symbol(ch: char) -> Option<Self> {
        let heading = match ch {
            '^' => Direction::Up,
            'v' => Direction::Down,
            '<' => Direction::Left,
            '>' => Direction::Right,
            _ => return None,
        };
        Some(Self { heading })
    }
}

impl State for Redirect {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn next(self: Box<Self>, ch: char, operators: &Operators) -> Box<dyn State> {
        follow(ch, operators)
    }

    fn run(&mut self, _ch: char, body: &mut Body) -> Result<(), OperatorFailure> {
        body.direction = Some(self.heading);
        body.advance();
        Ok(())
    }
}

/// Diagonal mirror: reflects the heading, then moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    /// `/`
    Slash,
    /// `\`
    Backslash,
}

impl Mirror {
    pub fn reflect(self, heading: Direction) -> Direction {
        match (self, heading) {
            (Mirror::Slash, Direction::Right) | (Mirror::Backslash, Direction::Left) => {
                Direction::Up
            }
            (Mirror::Slash, Direction::Left) | (Mirror::Backslash, Direction::Right) => {
                Direction::Down
            }
            (Mirror::Slash, Direction::Down) | (Mirror::Backslash, Direction::Up) => {
                Direction::Left
            }
            (Mirror::Slash, Direction::Up) | (Mirror::Backslash, Direction::Down) => {
                Direction::Right
            }
        }
    }
}

impl State for Mirror {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn next(self: Box<Self>, ch: char, operators: &Operators) -> Box<dyn State> {
        follow(ch, operators)
    }

    fn run(&mut self, _ch: char, body: &mut Body) -> Result<(), OperatorFailure> {
        body.direction = body.direction.map(|heading| self.reflect(heading));
        body.advance();
        Ok(())
    }
}
