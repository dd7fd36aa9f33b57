//! Engine error type.

use crate::marble::MarbleId;
use crate::vector::Pos;

/// Boxed failure raised by an operator state.
pub type OperatorFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A freshly spawned marble found no neighbor to head toward.
    #[error("marble cannot determine its direction at x: {}, y: {}", .position.x, .position.y)]
    DirectionUnresolved { position: Pos },

    #[error("operator '{symbol}' failed at {position}: {source}")]
    Operator {
        symbol: char,
        position: Pos,
        #[source]
        source: OperatorFailure,
    },

    /// A marble built against another environment was handed to a scheduler.
    #[error("marble {id} belongs to a different environment")]
    ForeignEnvironment { id: MarbleId },

    #[error("no marble ids left to assign")]
    IdsExhausted,

    #[error("invalid simulation config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}
