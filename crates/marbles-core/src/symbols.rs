//! Grid symbols the engine itself knows about.

/// Ends the whole simulation when a marble lands on it.
pub const HALT: char = '&';

/// Vertical track.
pub const PIPE: char = '|';

/// Horizontal track.
pub const DASH: char = '-';

/// Symbols a freshly spawned marble may head toward from any side.
pub const DIRECTIONAL: [char; 8] = ['\\', '/', '*', '^', 'v', '>', '<', '+'];

pub fn is_directional(ch: char) -> bool {
    DIRECTIONAL.contains(&ch)
}
