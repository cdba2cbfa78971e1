//! Source positions for diagnostics and edits

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the document text
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// Line number (1-indexed, 0 when unknown)
    pub line: usize,

    /// Column number (1-indexed, 0 when unknown)
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Whether the position refers to real source text
    #[must_use]
    pub const fn is_known(self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span of document text
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width range at a position
    #[must_use]
    pub const fn at(line: usize, column: usize) -> Self {
        let position = Position::new(line, column);
        Self {
            start: position,
            end: position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_order_by_line_then_column() {
        assert!(Position::new(2, 1) > Position::new(1, 40));
        assert!(Position::new(3, 2) < Position::new(3, 5));
        assert!(!Position::default().is_known());
        assert_eq!(Position::new(4, 7).to_string(), "4:7");
    }
}
