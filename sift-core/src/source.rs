//! The inbound contract: a pull cursor with one-event lookahead.
//!
//! Everything upstream of the filters is reached through [`EventSource`].
//! The filtering layer never rewinds; it only peeks one event ahead and
//! consumes forward. [`VecSource`] is the in-memory implementation, which
//! also serves as the target of the capped replay drain.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::event::Event;

/// An ordered, finite-or-unbounded sequence of events, pull-style.
///
/// `peek_next` must be idempotent: repeated calls without an intervening
/// `advance` return the same event. `advance` past the end fails with
/// [`Error::Exhausted`].
pub trait EventSource {
    /// Look at the next event without consuming it.
    fn peek_next(&mut self) -> Result<Option<&Event>>;

    /// Consume and return the next event.
    fn advance(&mut self) -> Result<Event>;
}

/// In-memory event source backed by a queue.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    events: VecDeque<Event>,
}

impl VecSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events: events.into() }
    }

    /// Drain another source into memory, capped at `max_events`.
    ///
    /// This is the replay pattern: materialize a stream once, then hand
    /// out cheap clones of the buffered source. The cap is mandatory and
    /// overflow is an explicit [`Error::BufferOverflow`] - a stream too
    /// large to buffer must fail, not exhaust memory.
    pub fn drain<S: EventSource>(source: &mut S, max_events: usize) -> Result<Self> {
        let mut events = VecDeque::new();
        loop {
            match source.advance() {
                Ok(event) => {
                    if events.len() >= max_events {
                        return Err(Error::BufferOverflow(max_events));
                    }
                    events.push_back(event);
                }
                Err(Error::Exhausted) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(Self { events })
    }

    /// Events remaining in the queue.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for VecSource {
    fn peek_next(&mut self) -> Result<Option<&Event>> {
        Ok(self.events.front())
    }

    fn advance(&mut self) -> Result<Event> {
        self.events.pop_front().ok_or(Error::Exhausted)
    }
}

impl FromIterator<Event> for VecSource {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self { events: iter.into_iter().collect() }
    }
}
