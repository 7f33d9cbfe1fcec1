//! The filtered cursor: per-call filtering over a pull event source.
//!
//! `FilteredReader` wraps an [`EventSource`] and applies an optional
//! accept filter plus an optional stop filter to decide what the caller
//! sees next. A `peek` walks the source until an event is accepted or
//! fires the stop filter. Each candidate is first evaluated with the
//! filters bracketed in peek mode; an event the walk then permanently
//! consumes is re-evaluated in commit mode, so stateful filters retire
//! their state for exactly the events that are really gone. The surfaced
//! event stays in the source and is committed only by `next_event`.
//!
//! The stop filter wins over the accept filter: once it matches the most
//! recently observed event, the cursor reports end-of-stream even though
//! raw events remain. `stopped` reflects only the latest observation, not
//! the cumulative history of the stream.

use std::collections::HashMap;
use std::fmt;
use std::mem;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::filter::{self, Filter, FilterSet};
use crate::source::EventSource;

/// What a single filter evaluation decided during a peek walk.
enum Step {
    /// Stop filter fired; the cursor is done.
    Stop,
    /// Accept filter passed; this is the next visible event.
    Surface(Event),
    /// Rejected; consume it and keep walking.
    Skip,
}

/// Pull cursor over filtered events.
pub struct FilteredReader<S> {
    source: S,
    filters: FilterSet,
    filter: Option<Filter>,
    stop_filter: Option<Filter>,
    stopped: bool,
    directives: HashMap<String, String>,
}

impl<S: EventSource> FilteredReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            filters: FilterSet::new(),
            filter: None,
            stop_filter: None,
            stopped: false,
            directives: HashMap::new(),
        }
    }

    /// Default namespace for name filters built by this reader.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.filters = FilterSet::new().with_namespace(namespace);
        self
    }

    /// The namespace-aware filter builder configured on this reader.
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Recover the wrapped source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Install (or clear) the accept filter.
    pub fn use_filter(&mut self, filter: impl Into<Option<Filter>>) -> &mut Self {
        self.filter = filter.into();
        debug!(reader = %self, "accept filter installed");
        self
    }

    /// Install (or clear) the stop filter.
    pub fn use_stop_filter(&mut self, filter: impl Into<Option<Filter>>) -> &mut Self {
        self.stop_filter = filter.into();
        debug!(reader = %self, "stop filter installed");
        self
    }

    /// True when the most recent observation fired the stop filter.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Value of a processing directive (`<?target data?>`) the cursor has
    /// consumed so far. A later directive with the same target wins; a
    /// directive without data reads as an empty string.
    pub fn directive(&self, target: &str) -> Option<&str> {
        self.directives.get(target).map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Core pull operations
    // ------------------------------------------------------------------

    /// Look at the next visible event without consuming it.
    ///
    /// Rejected events *are* consumed from the source; the surfaced event
    /// is not. Every observation is evaluated speculatively first (filters
    /// in peek mode), and consumed events get a committing evaluation, so
    /// repeating the peek - or committing it with
    /// [`next_event`](Self::next_event) - observes the same event and the
    /// same filter state.
    pub fn peek(&mut self) -> Result<Option<Event>> {
        let result = self.peek_walk();
        trace!(stopped = self.stopped, "peek complete");
        result
    }

    fn peek_walk(&mut self) -> Result<Option<Event>> {
        loop {
            if self.source.peek_next()?.is_none() {
                return Ok(None);
            }
            // speculative pass: peek mode suppresses filter state changes
            self.start_peeking();
            let step = self.evaluate_next();
            self.stop_peeking();
            match step? {
                Step::Stop => {
                    self.stopped = true;
                    return Ok(None);
                }
                Step::Surface(event) => {
                    self.stopped = false;
                    return Ok(Some(event));
                }
                Step::Skip => {
                    self.stopped = false;
                    // the event is gone for good, so the filters retire
                    // their state for it in a committing pass
                    self.evaluate_next()?;
                    self.take_next()?;
                }
            }
        }
    }

    /// Evaluate the source's lookahead event against both filters, in
    /// whatever mode the filters currently hold.
    fn evaluate_next(&mut self) -> Result<Step> {
        let Some(event) = self.source.peek_next()? else {
            return Ok(Step::Stop);
        };
        let accepted = match &mut self.filter {
            Some(f) => f.accept(event)?,
            None => true,
        };
        let stopped = match &mut self.stop_filter {
            Some(f) => f.accept(event)?,
            None => false,
        };
        Ok(if stopped {
            Step::Stop
        } else if accepted {
            Step::Surface(event.clone())
        } else {
            Step::Skip
        })
    }

    /// Advance the source, remembering any processing directive consumed.
    fn take_next(&mut self) -> Result<Event> {
        let event = self.source.advance()?;
        if let Event::ProcessingInstruction { target, data, .. } = &event {
            self.directives.insert(target.clone(), data.clone().unwrap_or_default());
        }
        Ok(event)
    }

    /// Pull the next visible event.
    ///
    /// Performs the peek itself, so the exhausted-iteration error covers
    /// both "never peeked" and "stream ended". The surfaced event is then
    /// re-evaluated in commit mode, which is what lets stateful filters
    /// retire the progress a peek only simulated.
    pub fn next_event(&mut self) -> Result<Event> {
        if self.peek()?.is_none() {
            return Err(Error::Exhausted);
        }
        loop {
            let event = self.take_next()?;
            let accepted = match &mut self.filter {
                Some(f) => f.accept(&event)?,
                None => true,
            };
            let stopped = match &mut self.stop_filter {
                Some(f) => f.accept(&event)?,
                None => false,
            };
            self.stopped = stopped;
            if accepted || stopped {
                trace!(event = %event, "event surfaced");
                return Ok(event);
            }
        }
    }

    /// True when another event is visible. Source failures read as end of
    /// stream here; pull the event itself to see the actual error.
    pub fn has_next(&mut self) -> bool {
        matches!(self.peek(), Ok(Some(_)))
    }

    /// Like [`next_event`](Self::next_event) but converts the exhausted
    /// signal into `None`. Corruption and source failures still propagate.
    pub fn next_event_opt(&mut self) -> Result<Option<Event>> {
        optional(self.next_event())
    }

    // ------------------------------------------------------------------
    // Scoped filter overrides
    // ------------------------------------------------------------------

    /// Run `body` with a replacement accept filter, restoring the previous
    /// one on every exit path.
    pub fn with_filter<R>(
        &mut self,
        filter: impl Into<Option<Filter>>,
        body: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let saved = mem::replace(&mut self.filter, filter.into());
        let result = body(self);
        self.filter = saved;
        result
    }

    /// Run `body` with a replacement stop filter, restoring the previous
    /// one on every exit path.
    pub fn with_stop_filter<R>(
        &mut self,
        stop_filter: impl Into<Option<Filter>>,
        body: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let saved = mem::replace(&mut self.stop_filter, stop_filter.into());
        let result = body(self);
        self.stop_filter = saved;
        result
    }

    /// Run `body` with both filters replaced, restoring the previous pair
    /// on every exit path.
    pub fn with_filters<R>(
        &mut self,
        filter: impl Into<Option<Filter>>,
        stop_filter: impl Into<Option<Filter>>,
        body: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let saved_filter = mem::replace(&mut self.filter, filter.into());
        let saved_stop = mem::replace(&mut self.stop_filter, stop_filter.into());
        let result = body(self);
        self.filter = saved_filter;
        self.stop_filter = saved_stop;
        result
    }

    // ------------------------------------------------------------------
    // One-shot pulls
    // ------------------------------------------------------------------

    /// Pull exactly one event under the given filters, then restore the
    /// previously active pair.
    pub fn next_matching(
        &mut self,
        filter: Filter,
        stop_filter: impl Into<Option<Filter>>,
    ) -> Result<Event> {
        self.with_filters(filter, stop_filter, |r| r.next_event())
    }

    /// Optional variant of [`next_matching`](Self::next_matching).
    pub fn next_matching_opt(
        &mut self,
        filter: Filter,
        stop_filter: impl Into<Option<Filter>>,
    ) -> Result<Option<Event>> {
        optional(self.next_matching(filter, stop_filter))
    }

    /// Next start tag carrying one of the given names, stopping early when
    /// a *different* start tag appears first. With no names, any start tag
    /// matches.
    pub fn next_start_element(&mut self, names: &[&str]) -> Result<Event> {
        self.pull_start_element(names, false)
    }

    /// Optional variant of [`next_start_element`](Self::next_start_element).
    pub fn next_start_element_opt(&mut self, names: &[&str]) -> Result<Option<Event>> {
        optional(self.pull_start_element(names, false))
    }

    /// Like [`next_start_element`](Self::next_start_element) but skips
    /// over intervening start tags instead of stopping at them.
    pub fn skip_to_start_element(&mut self, names: &[&str]) -> Result<Event> {
        self.pull_start_element(names, true)
    }

    /// Optional variant of [`skip_to_start_element`](Self::skip_to_start_element).
    pub fn skip_to_start_element_opt(&mut self, names: &[&str]) -> Result<Option<Event>> {
        optional(self.pull_start_element(names, true))
    }

    fn pull_start_element(&mut self, names: &[&str], skip_over_others: bool) -> Result<Event> {
        if names.is_empty() {
            return self.next_matching(filter::start_element(), None);
        }
        let fs = self.filters.clone();
        let accept = filter::named(
            format!("startElement{names:?}"),
            filter::any(names.iter().map(|n| fs.start_element(*n)).collect()),
        );
        let stop = if skip_over_others {
            None
        } else {
            let other = filter::not(filter::any(
                names.iter().map(|n| fs.element(*n)).collect(),
            ));
            Some(filter::named(
                format!("startElementNot{names:?}"),
                filter::all(vec![filter::start_element(), other]),
            ))
        };
        self.next_matching(accept, stop)
    }

    /// Next start or end tag, silently consuming whitespace, comments and
    /// processing instructions on the way. Any other content is a fatal
    /// structural error. An already-installed stop filter still applies.
    pub fn next_tag(&mut self) -> Result<Event> {
        let saved_present = self.stop_filter.is_some();
        let mut stop_members = vec![non_tag_filter()];
        if let Some(saved) = self.stop_filter.take() {
            stop_members.push(saved);
        }
        self.stop_filter = Some(filter::any(stop_members));

        let outcome = self.pull_tag();

        // hand the saved stop filter back out of the aggregate so its
        // state survives this call
        self.stop_filter = match self.stop_filter.take() {
            Some(Filter::Any(mut members)) if saved_present => members.pop(),
            _ => None,
        };
        outcome
    }

    fn pull_tag(&mut self) -> Result<Event> {
        let tag = filter::named(
            "tag",
            filter::any(vec![filter::start_element(), filter::end_element()]),
        );
        let result = self.with_filter(tag, |r| r.next_event());
        match result {
            Ok(event) => Ok(event),
            Err(Error::Exhausted) if self.stopped => {
                // the stop fired mid-walk: on non-tag content that is
                // corruption, on a caller-installed stop it is a real stop
                let offending = self.source.peek_next()?.cloned();
                match offending {
                    Some(event) if is_non_tag_content(&event) => Err(Error::corrupt(
                        format!("{event} encountered where only tags and whitespace are allowed"),
                        Some(event.location()),
                    )),
                    _ => Err(Error::Exhausted),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Optional variant of [`next_tag`](Self::next_tag): exhaustion reads
    /// as `None`, corruption still fails.
    pub fn next_tag_opt(&mut self) -> Result<Option<Event>> {
        optional(self.next_tag())
    }

    /// Text of a text-only element. The cursor must stand just past the
    /// start tag; character runs are concatenated (comments and processing
    /// instructions in between are skipped) and the end tag is consumed.
    /// A child element is a fatal structural error.
    ///
    /// Reads the raw source directly - per-event filters do not apply.
    pub fn element_text(&mut self) -> Result<String> {
        let mut text = String::new();
        loop {
            let done = {
                let Some(event) = self.source.peek_next()? else {
                    return Err(Error::Exhausted);
                };
                match event {
                    Event::Characters { .. }
                    | Event::Comment { .. }
                    | Event::ProcessingInstruction { .. } => false,
                    Event::EndElement { .. } => true,
                    other => {
                        return Err(Error::corrupt(
                            format!("{other} encountered while reading element text"),
                            Some(other.location()),
                        ))
                    }
                }
            };
            if done {
                self.source.advance()?;
                return Ok(text);
            }
            if let Event::Characters { text: run, .. } = self.take_next()? {
                text.push_str(&run);
            }
        }
    }

    /// Optional variant of [`element_text`](Self::element_text).
    pub fn element_text_opt(&mut self) -> Result<Option<String>> {
        optional(self.element_text())
    }

    /// Iterate over the remaining visible events. The iterator fuses after
    /// exhaustion or the first error.
    pub fn events(&mut self) -> Events<'_, S> {
        Events { reader: self, done: false }
    }

    // ------------------------------------------------------------------
    // Peek bracketing
    // ------------------------------------------------------------------

    fn start_peeking(&mut self) {
        if let Some(f) = &mut self.filter {
            f.start_peeking();
        }
        if let Some(f) = &mut self.stop_filter {
            f.start_peeking();
        }
    }

    fn stop_peeking(&mut self) {
        if let Some(f) = &mut self.filter {
            f.stop_peeking();
        }
        if let Some(f) = &mut self.stop_filter {
            f.stop_peeking();
        }
    }
}

impl<S> fmt::Display for FilteredReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(f: &mut fmt::Formatter<'_>, filter: &Option<Filter>) -> fmt::Result {
            match filter {
                Some(filter) => write!(f, "{filter}"),
                None => f.write_str("none"),
            }
        }
        f.write_str("FilteredReader{filter=")?;
        opt(f, &self.filter)?;
        f.write_str(", stopFilter=")?;
        opt(f, &self.stop_filter)?;
        write!(f, ", stopped={}}}", self.stopped)
    }
}

/// Iterator over the remaining visible events of a reader.
pub struct Events<'a, S: EventSource> {
    reader: &'a mut FilteredReader<S>,
    done: bool,
}

impl<S: EventSource> Iterator for Events<'_, S> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_event() {
            Ok(event) => Some(Ok(event)),
            Err(Error::Exhausted) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Exhausted) => Ok(None),
        Err(err) => Err(err),
    }
}

fn non_tag_filter() -> Filter {
    filter::named(
        "nonTag",
        filter::not(filter::any(vec![
            filter::start_element(),
            filter::end_element(),
            filter::whitespace(),
            filter::comment(),
            filter::processing_instruction(),
        ])),
    )
}

fn is_non_tag_content(event: &Event) -> bool {
    use crate::event::EventKind::*;
    !(event.is_start_element()
        || event.is_end_element()
        || event.is_whitespace()
        || matches!(event.kind(), Comment | ProcessingInstruction))
}
