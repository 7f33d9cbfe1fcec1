//! Source positions for events and errors.
//!
//! A `Location` is attached to every event the source produces and is
//! carried through into structural errors so callers can point at the
//! offending spot in the input.

use std::fmt;

/// A position in the underlying markup stream.
///
/// Lines and columns are 1-based. `offset` is the byte offset from the
/// start of the input, useful when line tracking is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: u64,
    pub column: u64,
    pub offset: u64,
}

impl Location {
    /// Create a location at the given line and column.
    pub fn new(line: u64, column: u64, offset: u64) -> Self {
        Self { line, column, offset }
    }

    /// The start of the input.
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.line, self.column)
    }
}
