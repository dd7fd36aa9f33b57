//! Notification sinks driven by the engine.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::marble::{Marble, MarbleId};
use crate::vector::Pos;

/// Receives the engine's notifications. Nothing a notifier does feeds back
/// into the simulation.
pub trait Notifier: Send + Sync {
    /// One iteration of a run-until-waiting tick is about to start.
    fn on_micro_tick(&self, marble: &Marble);

    /// A marble reached the halt symbol; the simulation is over.
    fn on_finish(&self);

    fn on_error(&self, error: &EngineError);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn on_micro_tick(&self, _marble: &Marble) {}

    fn on_finish(&self) {}

    fn on_error(&self, _error: &EngineError) {}
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn on_micro_tick(&self, marble: &Marble) {
        tracing::trace!(
            "[notify] micro-tick marble={} at {} ({})",
            marble.id(),
            marble.position(),
            marble.state().name()
        );
    }

    fn on_finish(&self) {
        tracing::info!("[notify] Program finished");
    }

    fn on_error(&self, error: &EngineError) {
        tracing::error!("[notify] {error}");
    }
}

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    MicroTick { id: MarbleId, position: Pos },
    Finish,
    Error(String),
}

/// Records every notification in arrival order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Notification>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().clone()
    }

    /// Drains the log.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn micro_ticks(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Notification::MicroTick { .. }))
            .count()
    }

    pub fn finished(&self) -> bool {
        self.events.lock().contains(&Notification::Finish)
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Notification::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, notification: Notification) {
        self.events.lock().push(notification);
    }
}

impl Notifier for EventLog {
    fn on_micro_tick(&self, marble: &Marble) {
        self.push(Notification::MicroTick {
            id: marble.id(),
            position: marble.position(),
        });
    }

    fn on_finish(&self) {
        self.push(Notification::Finish);
    }

    fn on_error(&self, error: &EngineError) {
        self.push(Notification::Error(error.to_string()));
    }
}
