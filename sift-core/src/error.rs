//! Error kinds for the filtering layer.
//!
//! The split matters to callers: `Exhausted` is the expected end-of-data
//! signal and the only kind the `*_opt` reader operations convert into
//! `None`. Everything else is a real failure and always propagates - a
//! corrupted stream must never be mistaken for a clean end of input.

use thiserror::Error;

use crate::span::Location;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

fn at(location: &Option<Location>) -> String {
    match location {
        Some(l) => format!(" at {l}"),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// No next event: the stream ended or the stop filter fired.
    /// Recoverable - this is the normal end-of-iteration signal.
    #[error("no more events")]
    Exhausted,

    /// The stream is structurally broken: unbalanced tags, or content
    /// where only tags and whitespace are allowed. Fatal.
    #[error("malformed markup: {message}{}", at(.location))]
    Corrupt {
        message: String,
        location: Option<Location>,
    },

    /// The underlying source failed to tokenize its input. Fatal.
    #[error("parse error: {message}{}", at(.location))]
    Parse {
        message: String,
        location: Option<Location>,
    },

    /// A capability this layer does not implement.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// A capped replay drain hit its limit.
    #[error("replay buffer exceeded {0} events")]
    BufferOverflow(usize),
}

impl Error {
    /// Structural-corruption error at an optional location.
    pub fn corrupt(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Corrupt { message: message.into(), location }
    }

    /// Source parse failure at an optional location.
    pub fn parse(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Parse { message: message.into(), location }
    }

    /// True for the recoverable end-of-data signal.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Error::Exhausted)
    }
}
