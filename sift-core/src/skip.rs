//! Subtree skipper: swallow everything under an already-seen start tag.
//!
//! Once a start tag has been observed the skipper rejects every event up
//! to and including the balancing end tag, whatever the nesting depth. A
//! stack of pending start names tracks where we are; end tags must match
//! the top of the stack or the markup is structurally broken.
//!
//! An end tag arriving with an empty stack closes something *outside* the
//! tracked subtree, so it passes through - that is the one case where this
//! filter answers true.

use std::fmt;

use crate::error::{Error, Result};
use crate::event::{Event, QName};
use crate::peek::PeekDepth;

/// Stateful filter that suppresses the events of balanced subtrees.
pub struct SkipSubtree {
    stack: Vec<QName>,
    peek: PeekDepth,
}

impl SkipSubtree {
    pub fn new() -> Self {
        Self { stack: Vec::new(), peek: PeekDepth::new() }
    }

    /// Evaluate one event. Only pops/pushes the stack in commit mode; a
    /// peeked end tag inspects the top without removing it.
    pub fn accept(&mut self, event: &Event) -> Result<bool> {
        match event {
            Event::StartElement { name, .. } => {
                if !self.peek.is_peeking() {
                    self.stack.push(name.clone());
                }
                Ok(false)
            }
            Event::EndElement { name, location } => {
                let pending = if self.peek.is_peeking() {
                    self.stack.last().cloned()
                } else {
                    self.stack.pop()
                };
                match pending {
                    None => Ok(true),
                    Some(open) if open == *name => Ok(false),
                    Some(open) => Err(Error::corrupt(
                        format!("unmatched end element </{name}>, expected </{open}>"),
                        Some(*location),
                    )),
                }
            }
            _ => Ok(false),
        }
    }

    pub fn start_peeking(&mut self) {
        self.peek.start();
    }

    pub fn stop_peeking(&mut self) {
        self.peek.stop();
    }

    pub fn is_peeking(&self) -> bool {
        self.peek.is_peeking()
    }

    /// Number of start tags still awaiting their end tag.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Default for SkipSubtree {
    fn default() -> Self {
        Self::new()
    }
}

/// A clone starts over with an empty stack and zero peek depth.
impl Clone for SkipSubtree {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Display for SkipSubtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipSubtree{{stack=[")?;
        for (i, name) in self.stack.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "], peeks={}}}", self.peek.depth())
    }
}

impl fmt::Debug for SkipSubtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
