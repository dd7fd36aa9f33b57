//! Read-only view of the program grid.

use std::fmt;

use crate::vector::Pos;

/// Query surface over the character grid.
///
/// `char_at` is only consulted for coordinates where `exists` holds.
pub trait World: Send + Sync {
    fn exists(&self, pos: Pos) -> bool;

    fn char_at(&self, pos: Pos) -> Option<char>;
}

/// Grid of characters backed by rows. Rows may have different lengths; a
/// cell exists only where its row actually has a character.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<char>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<char>>) -> Self {
        Self { rows }
    }

    /// Splits `text` into rows on line breaks.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines().map(|line| line.chars().collect()).collect())
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<char>] {
        &self.rows
    }

    /// Positions of every occurrence of `ch`, row by row.
    pub fn find_all(&self, ch: char) -> Vec<Pos> {
        let mut found = Vec::new();
        for (y, row) in self.rows.iter().enumerate() {
            for (x, &c) in row.iter().enumerate() {
                if c == ch {
                    #[allow(clippy::cast_possible_wrap)]
                    found.push(Pos::new(x as i64, y as i64));
                }
            }
        }
        found
    }

    fn cell(&self, pos: Pos) -> Option<char> {
        let x = usize::try_from(pos.x).ok()?;
        let y = usize::try_from(pos.y).ok()?;
        self.rows.get(y)?.get(x).copied()
    }
}

impl World for Grid {
    fn exists(&self, pos: Pos) -> bool {
        self.cell(pos).is_some()
    }

    fn char_at(&self, pos: Pos) -> Option<char> {
        self.cell(pos)
    }
}

impl From<&str> for Grid {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}
