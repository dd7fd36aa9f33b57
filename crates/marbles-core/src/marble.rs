//! Marble execution: spawning, heading resolution and the tick loop.

use std::fmt;
use std::mem;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::EngineError;
use crate::state::{Dead, State, Traveling};
use crate::symbols;
use crate::vector::{Direction, Pos};

/// Identifier of a marble. Carries no meaning for the engine.
pub type MarbleId = u32;

/// The part of a marble that states are allowed to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Pos,
    /// `None` only when no heading could be resolved at spawn.
    pub direction: Option<Direction>,
    pub value: f64,
    pub stack: Vec<f64>,
}

impl Body {
    pub fn new(position: Pos, direction: Option<Direction>) -> Self {
        Self {
            position,
            direction,
            value: 0.0,
            stack: Vec::new(),
        }
    }

    /// Moves one cell in the current heading. Without a heading this does nothing.
    pub fn advance(&mut self) {
        if let Some(direction) = self.direction {
            self.position += direction;
        }
    }

    /// Offset vector of the heading, `Pos::ZERO` when unresolved.
    pub fn heading(&self) -> Pos {
        self.direction.map_or(Pos::ZERO, Direction::offset)
    }
}

/// Optional parts of a marble at spawn time.
#[derive(Debug, Default)]
pub struct MarbleOptions {
    pub id: Option<MarbleId>,
    pub value: Option<f64>,
    pub direction: Option<Direction>,
    pub state: Option<Box<dyn State>>,
    pub stack: Option<Vec<f64>>,
}

impl MarbleOptions {
    pub fn id(mut self, id: MarbleId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn state(mut self, state: impl State + 'static) -> Self {
        self.state = Some(Box::new(state));
        self
    }

    pub fn stack(mut self, stack: Vec<f64>) -> Self {
        self.stack = Some(stack);
        self
    }
}

/// How a call to [`Marble::simulate_tick`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    /// Single-step mode finished its one iteration.
    Stepped,
    /// The marble's state asked to yield.
    Waiting,
    /// The marble came back to a cell already visited during this call.
    Revisited,
    Dead,
    /// The simulation has reached the halt symbol.
    Halted,
}

impl TickOutcome {
    pub fn is_halted(self) -> bool {
        self == TickOutcome::Halted
    }
}

/// Serializable view of a marble for renderers and bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarbleSnapshot {
    pub id: MarbleId,
    pub position: Pos,
    pub direction: Option<Direction>,
    pub value: f64,
    pub stack: Vec<f64>,
    pub state: String,
    pub dead: bool,
}

/// A moving execution unit on the grid.
pub struct Marble {
    env: Arc<Environment>,
    id: MarbleId,
    body: Body,
    state: Box<dyn State>,
}

impl Marble {
    /// Creates a marble at `position` and performs its first move.
    ///
    /// Without an explicit direction the heading is resolved from the
    /// neighboring cells. If that fails the error goes to the notifier and
    /// the marble is dead from the start.
    pub fn spawn(env: Arc<Environment>, position: Pos, options: MarbleOptions) -> Self {
        let MarbleOptions {
            id,
            value,
            direction,
            state,
            stack,
        } = options;

        let mut marble = Self {
            env,
            id: id.unwrap_or(0),
            body: Body {
                position,
                direction: None,
                value: value.unwrap_or(0.0),
                stack: stack.unwrap_or_default(),
            },
            state: state.unwrap_or_else(|| Box::new(Traveling)),
        };

        marble.body.direction = match direction {
            Some(direction) => Some(direction),
            None => marble.resolve_direction(),
        };
        marble.body.advance();

        tracing::debug!(
            "[marble] Spawned marble={} at {} heading {:?}",
            marble.id,
            marble.body.position,
            marble.body.direction
        );
        marble
    }

    /// Picks the first neighbor, in [`Direction::ALL`] order, that a marble
    /// can head toward: a pipe above or below, a dash left or right, or any
    /// directional symbol.
    fn resolve_direction(&mut self) -> Option<Direction> {
        let world = self.env.world();

        for direction in Direction::ALL {
            let neighbor = self.body.position + direction;

            if !world.exists(neighbor) {
                continue;
            }
            let Some(ch) = world.char_at(neighbor) else {
                continue;
            };

            if direction.is_vertical() && ch == symbols::PIPE {
                return Some(direction);
            }
            if direction.is_horizontal() && ch == symbols::DASH {
                return Some(direction);
            }
            if symbols::is_directional(ch) {
                return Some(direction);
            }
        }

        let error = EngineError::DirectionUnresolved {
            position: self.body.position,
        };
        tracing::warn!("[marble] marble={}: {error}", self.id);
        self.env.notifier().on_error(&error);
        self.state = Box::new(Dead);
        None
    }

    /// Advances the marble.
    ///
    /// With `run_until_waiting` false this performs exactly one iteration.
    /// Otherwise it keeps iterating until the state waits, the marble dies,
    /// or the marble comes back to a cell it already visited during this
    /// call. Reaching the halt symbol halts the whole environment.
    pub fn simulate_tick(&mut self, run_until_waiting: bool) -> Result<TickOutcome, EngineError> {
        let env = Arc::clone(&self.env);

        if env.is_halted() {
            return Ok(TickOutcome::Halted);
        }
        if self.state.is_dead() {
            return Ok(TickOutcome::Dead);
        }

        let mut visited: Vec<Pos> = Vec::new();

        loop {
            if run_until_waiting {
                env.notifier().on_micro_tick(self);
            }

            let position = self.body.position;
            if visited.contains(&position) {
                tracing::trace!("[marble] marble={} revisited {position}, yielding", self.id);
                return Ok(TickOutcome::Revisited);
            }
            visited.push(position);

            if !env.world().exists(position) {
                return Ok(self.die("left the grid"));
            }
            let Some(ch) = env.world().char_at(position) else {
                return Ok(self.die("left the grid"));
            };

            if ch == symbols::HALT {
                self.state = Box::new(Dead);
                if env.halt() {
                    tracing::info!("[marble] marble={} reached halt at {position}", self.id);
                    env.notifier().on_finish();
                }
                return Ok(TickOutcome::Halted);
            }

            let current = mem::replace(&mut self.state, Box::new(Dead));
            let mut next = current.next(ch, env.operators());
            let ran = next.run(ch, &mut self.body);
            self.state = next;
            ran.map_err(|source| EngineError::Operator {
                symbol: ch,
                position,
                source,
            })?;

            if self.state.is_dead() {
                tracing::debug!("[marble] marble={} died on '{ch}' at {position}", self.id);
                return Ok(TickOutcome::Dead);
            }
            if self.state.is_waiting() {
                return Ok(TickOutcome::Waiting);
            }
            if !run_until_waiting {
                return Ok(TickOutcome::Stepped);
            }
        }
    }

    fn die(&mut self, reason: &str) -> TickOutcome {
        tracing::debug!(
            "[marble] marble={} {reason} at {}",
            self.id,
            self.body.position
        );
        self.state = Box::new(Dead);
        TickOutcome::Dead
    }

    pub fn id(&self) -> MarbleId {
        self.id
    }

    pub fn position(&self) -> Pos {
        self.body.position
    }

    pub fn direction(&self) -> Option<Direction> {
        self.body.direction
    }

    /// Heading as a vector; `Pos::ZERO` if none could be resolved.
    pub fn heading(&self) -> Pos {
        self.body.heading()
    }

    pub fn value(&self) -> f64 {
        self.body.value
    }

    pub fn stack(&self) -> &[f64] {
        &self.body.stack
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn state(&self) -> &dyn State {
        self.state.as_ref()
    }

    pub fn is_dead(&self) -> bool {
        self.state.is_dead()
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.env
    }

    pub fn snapshot(&self) -> MarbleSnapshot {
        MarbleSnapshot {
            id: self.id,
            position: self.body.position,
            direction: self.body.direction,
            value: self.body.value,
            stack: self.body.stack.clone(),
            state: self.state.name().to_string(),
            dead: self.is_dead(),
        }
    }
}

impl fmt::Debug for Marble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marble")
            .field("id", &self.id)
            .field("position", &self.body.position)
            .field("direction", &self.body.direction)
            .field("value", &self.body.value)
            .field("stack", &self.body.stack)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notification;
    use crate::test_utils::{Countdown, Failing, Spin, StrictWorld, env_with_log};

    #[test]
    fn test_spawn_moves_once() {
        let (env, _) = env_with_log("o---");
        let marble = Marble::spawn(env, Pos::new(0, 0), MarbleOptions::default());

        assert_eq!(marble.direction(), Some(Direction::Right));
        assert_eq!(marble.position(), Pos::new(1, 0));
        assert_eq!(marble.id(), 0);
        assert_eq!(marble.value(), 0.0);
        assert!(marble.stack().is_empty());
        assert_eq!(marble.state().name(), "traveling");
    }

    #[test]
    fn test_spawn_with_options() {
        let (env, _) = env_with_log("o---");
        let marble = Marble::spawn(
            env,
            Pos::new(0, 0),
            MarbleOptions::default()
                .id(7)
                .value(2.5)
                .direction(Direction::Down)
                .stack(vec![1.0, 2.0]),
        );

        assert_eq!(marble.id(), 7);
        assert_eq!(marble.value(), 2.5);
        assert_eq!(marble.stack(), &[1.0, 2.0]);
        assert_eq!(marble.position(), Pos::new(0, 1));
    }

    #[test]
    fn test_direction_scan_order_up_first() {
        // Pipe below and arrow above: up is scanned first.
        let (env, _) = env_with_log(" >\n o\n |");
        let marble = Marble::spawn(env, Pos::new(1, 1), MarbleOptions::default());
        assert_eq!(marble.direction(), Some(Direction::Up));
    }

    #[test]
    fn test_direction_scan_order_pipe_below_beats_sides() {
        let (env, _) = env_with_log(" \n-o-\n |");
        let marble = Marble::spawn(env, Pos::new(1, 1), MarbleOptions::default());
        assert_eq!(marble.direction(), Some(Direction::Down));
    }

    #[test]
    fn test_direction_scan_left_before_right() {
        let (env, _) = env_with_log("*o-");
        let marble = Marble::spawn(env, Pos::new(1, 0), MarbleOptions::default());
        assert_eq!(marble.direction(), Some(Direction::Left));
    }

    #[test]
    fn test_track_orientation_matters() {
        // A dash above and a pipe to the left are not valid headings.
        let (env, _) = env_with_log(" -\n|o/");
        let marble = Marble::spawn(env, Pos::new(1, 1), MarbleOptions::default());
        assert_eq!(marble.direction(), Some(Direction::Right));
    }

    #[test]
    fn test_direction_unresolved() {
        let (env, log) = env_with_log("-\no\n-");
        let marble = Marble::spawn(env, Pos::new(0, 1), MarbleOptions::default().id(3));

        assert!(marble.is_dead());
        assert_eq!(marble.direction(), None);
        assert_eq!(marble.heading(), Pos::ZERO);
        assert_eq!(marble.position(), Pos::new(0, 1));
        assert_eq!(
            log.errors(),
            vec!["marble cannot determine its direction at x: 0, y: 1".to_string()]
        );
    }

    #[test]
    fn test_unresolved_overrides_given_state() {
        let (env, _) = env_with_log("o");
        let marble = Marble::spawn(env, Pos::new(0, 0), MarbleOptions::default().state(Spin));
        assert!(marble.is_dead());
    }

    #[test]
    fn test_single_step_moves_one_cell() {
        let (env, log) = env_with_log("o----");
        let mut marble = Marble::spawn(env, Pos::new(0, 0), MarbleOptions::default());

        let outcome = marble.simulate_tick(false).unwrap();
        assert_eq!(outcome, TickOutcome::Stepped);
        assert_eq!(marble.position(), Pos::new(2, 0));
        assert_eq!(log.micro_ticks(), 0);
    }

    #[test]
    fn test_runs_off_the_grid() {
        let env = StrictWorld::env("o--");
        let mut marble = Marble::spawn(env, Pos::new(0, 0), MarbleOptions::default());

        let outcome = marble.simulate_tick(true).unwrap();
        assert_eq!(outcome, TickOutcome::Dead);
        assert!(marble.is_dead());
        assert_eq!(marble.position(), Pos::new(3, 0));
    }

    #[test]
    fn test_single_step_dies_on_the_tick_that_leaves() {
        let env = StrictWorld::env("o-");
        let mut marble = Marble::spawn(env, Pos::new(0, 0), MarbleOptions::default());

        assert_eq!(marble.simulate_tick(false).unwrap(), TickOutcome::Stepped);
        assert!(!marble.is_dead());
        assert_eq!(marble.simulate_tick(false).unwrap(), TickOutcome::Dead);
        assert!(marble.is_dead());
    }

    #[test]
    fn test_dead_is_absorbing() {
        let (env, log) = env_with_log("o-");
        let mut marble = Marble::spawn(env, Pos::new(0, 0), MarbleOptions::default().value(4.0));
        marble.simulate_tick(true).unwrap();
        assert!(marble.is_dead());

        let before = marble.snapshot();
        log.take();
        for run_until_waiting in [true, false, true] {
            assert_eq!(marble.simulate_tick(run_until_waiting).unwrap(), TickOutcome::Dead);
        }
        assert_eq!(marble.snapshot(), before);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_loop_guard_on_stationary_state() {
        let (env, log) = env_with_log("o----");
        let mut marble = Marble::spawn(
            env,
            Pos::new(0, 0),
            MarbleOptions::default().direction(Direction::Right).state(Spin),
        );

        let outcome = marble.simulate_tick(true).unwrap();
        assert_eq!(outcome, TickOutcome::Revisited);
        assert_eq!(marble.position(), Pos::new(1, 0));
        assert!(!marble.is_dead());
        // One iteration, then the revisit check on the second.
        assert_eq!(log.micro_ticks(), 2);
    }

    #[test]
    fn test_loop_guard_resets_between_calls() {
        let (env, _) = env_with_log("o----");
        let mut marble = Marble::spawn(
            env,
            Pos::new(0, 0),
            MarbleOptions::default().direction(Direction::Right).state(Spin),
        );

        for _ in 0..3 {
            assert_eq!(marble.simulate_tick(true).unwrap(), TickOutcome::Revisited);
        }
        for _ in 0..3 {
            assert_eq!(marble.simulate_tick(false).unwrap(), TickOutcome::Stepped);
        }
    }

    #[test]
    fn test_loop_guard_on_closed_track() {
        let (env, _) = env_with_log("o>-v\n ^-<");
        let mut marble = Marble::spawn(env, Pos::new(0, 0), MarbleOptions::default());
        assert_eq!(marble.position(), Pos::new(1, 0));

        let outcome = marble.simulate_tick(true).unwrap();
        assert_eq!(outcome, TickOutcome::Revisited);
        assert_eq!(marble.position(), Pos::new(1, 0));
    }

    #[test]
    fn test_single_step_against_run_until_waiting() {
        let grid = "o---------";

        let (env, log) = env_with_log(grid);
        let mut stepped = Marble::spawn(
            env,
            Pos::new(0, 0),
            MarbleOptions::default().state(Countdown::new(4)),
        );
        for expected_x in [2, 3, 4] {
            assert_eq!(stepped.simulate_tick(false).unwrap(), TickOutcome::Stepped);
            assert_eq!(stepped.position(), Pos::new(expected_x, 0));
        }
        assert!(!stepped.state().is_waiting());
        assert_eq!(log.micro_ticks(), 0);

        let (env, log) = env_with_log(grid);
        let mut running = Marble::spawn(
            env,
            Pos::new(0, 0),
            MarbleOptions::default().state(Countdown::new(4)),
        );
        assert_eq!(running.simulate_tick(true).unwrap(), TickOutcome::Waiting);
        assert_eq!(running.position(), Pos::new(4, 0));
        assert!(running.state().is_waiting());
        assert_eq!(log.micro_ticks(), 4);
    }

    #[test]
    fn test_waiting_state_resumes_on_next_call() {
        let (env, _) = env_with_log("o---------");
        let mut marble = Marble::spawn(
            env,
            Pos::new(0, 0),
            MarbleOptions::default().state(Countdown::new(1)),
        );
        assert_eq!(marble.simulate_tick(true).unwrap(), TickOutcome::Waiting);
        assert_eq!(marble.position(), Pos::new(1, 0));

        // The countdown is exhausted and stays waiting on every later call.
        assert_eq!(marble.simulate_tick(true).unwrap(), TickOutcome::Waiting);
        assert_eq!(marble.position(), Pos::new(1, 0));
    }

    #[test]
    fn test_halt_symbol() {
        let (env, log) = env_with_log("o-&");
        let mut marble = Marble::spawn(Arc::clone(&env), Pos::new(0, 0), MarbleOptions::default());

        let outcome = marble.simulate_tick(true).unwrap();
        assert!(outcome.is_halted());
        assert!(marble.is_dead());
        assert!(env.is_halted());
        assert_eq!(marble.position(), Pos::new(2, 0));
        assert_eq!(log.events().last(), Some(&Notification::Finish));

        log.take();
        assert_eq!(marble.simulate_tick(true).unwrap(), TickOutcome::Halted);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_steering_through_operators() {
        let (env, _) = env_with_log("o-\\\n  |\n  >-");
        let mut marble = Marble::spawn(env, Pos::new(0, 0), MarbleOptions::default());

        assert_eq!(marble.simulate_tick(true).unwrap(), TickOutcome::Dead);
        assert_eq!(marble.direction(), Some(Direction::Right));
        assert_eq!(marble.position(), Pos::new(4, 2));
    }

    #[test]
    fn test_operator_failure_propagates() {
        let (env, _) = env_with_log("o---");
        let mut marble = Marble::spawn(
            env,
            Pos::new(0, 0),
            MarbleOptions::default().state(Failing),
        );

        let err = marble.simulate_tick(true).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Operator { symbol: '-', position, .. } if position == Pos::new(1, 0)
        ));
    }

    #[test]
    fn test_snapshot() {
        let (env, _) = env_with_log("o---");
        let marble = Marble::spawn(env, Pos::new(0, 0), MarbleOptions::default().id(2).value(1.5));
        let snapshot = marble.snapshot();

        assert_eq!(snapshot.id, 2);
        assert_eq!(snapshot.position, Pos::new(1, 0));
        assert_eq!(snapshot.direction, Some(Direction::Right));
        assert_eq!(snapshot.state, "traveling");
        assert!(!snapshot.dead);

        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: MarbleSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_marble_at_coordinate_limit_leaves_the_grid() {
        let env = StrictWorld::env("o-");
        let mut marble = Marble::spawn(
            env,
            Pos::new(i64::MAX, 0),
            MarbleOptions::default().direction(Direction::Right),
        );
        assert_eq!(marble.position(), Pos::new(i64::MIN, 0));

        assert_eq!(marble.simulate_tick(true).unwrap(), TickOutcome::Dead);
        assert!(marble.is_dead());
    }
}
