//! Sequential matcher: an ordered list of filters matched across
//! successive events.
//!
//! A chain of `[start_of("a"), end_of("a")]` fires once per complete
//! `<a> ... </a>` span: the first stage must match some event, then the
//! second stage must match some later event, and only the event that
//! completes the final stage is reported as accepted.
//!
//! The work queue holds stage *indices* into the fixed stage list; after a
//! full match it instantly resets to the complete list, ready for the next
//! occurrence.
//!
//! Peek behaviour: a speculative observation never moves the queue. An
//! accepted stage is pushed back whatever its position - the event that
//! completes the final stage still reports true, so the caller can see
//! the match, but only a committing evaluation retires a stage. Peek
//! mode is not propagated into the stages themselves; stages are
//! expected to be stateless predicates.

use std::collections::VecDeque;
use std::fmt;

use crate::error::Result;
use crate::event::Event;
use crate::filter::Filter;
use crate::peek::PeekDepth;

/// Multi-stage sequential matcher over successive events.
pub struct Chain {
    stages: Vec<Filter>,
    queue: VecDeque<usize>,
    peek: PeekDepth,
}

impl Chain {
    /// Build a chain from its ordered stages.
    ///
    /// # Panics
    ///
    /// Panics when `stages` is empty; a chain with nothing to match is a
    /// construction error.
    pub fn new(stages: Vec<Filter>) -> Self {
        assert!(!stages.is_empty(), "chain requires at least one stage filter");
        let queue = (0..stages.len()).collect();
        Self { stages, queue, peek: PeekDepth::new() }
    }

    /// Evaluate the current stage against an event.
    pub fn accept(&mut self, event: &Event) -> Result<bool> {
        let stage = self.queue.pop_front().expect("chain queue is never left empty");
        let accepted = self.stages[stage].accept(event)?;
        let done = accepted && self.queue.is_empty();
        if !accepted || self.peek.is_peeking() {
            self.queue.push_front(stage);
        }
        if self.queue.is_empty() {
            self.queue.extend(0..self.stages.len());
        }
        Ok(done)
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

    /// Stages still required to complete the current match cycle.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Total number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Copies share no mutable state: a clone starts a fresh match cycle at
/// stage zero with zero peek depth.
impl Clone for Chain {
    fn clone(&self) -> Self {
        Chain::new(self.stages.clone())
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain{{queue=[")?;
        for (i, stage) in self.queue.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.stages[*stage])?;
        }
        write!(f, "], peeks={}}}", self.peek.depth())
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
