//! The peek protocol: reference-counted speculation depth.
//!
//! A cursor peek must be invisible: any event it shows the caller will be
//! presented again on the committing pull. Stateful filters therefore need
//! to know whether an observation is speculative. Each of them owns a
//! [`PeekDepth`]; the cursor brackets every lookahead with `start()` /
//! `stop()` and the filter consults `is_peeking()` before mutating.
//!
//! Calls nest - a combinator wrapping another filter may re-enter the
//! protocol - so only the 0→1 and 1→0 edges are meaningful. `start()` and
//! `stop()` report those edges so an owner can run one-time enter/exit
//! hooks; depths in between are invisible.

/// Non-negative speculation depth owned by a stateful filter.
#[derive(Debug, Default)]
pub struct PeekDepth {
    count: u32,
}

impl PeekDepth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter one level of peek mode. Returns true on the 0→1 edge.
    pub fn start(&mut self) -> bool {
        self.count += 1;
        self.count == 1
    }

    /// Leave one level of peek mode. Returns true on the 1→0 edge.
    ///
    /// # Panics
    ///
    /// Panics when called at depth 0. An unmatched `stop` is a programming
    /// error in the caller's peek bracketing, not a data condition, and it
    /// must not be silently clamped away.
    pub fn stop(&mut self) -> bool {
        assert!(self.count > 0, "stop_peeking called without a matching start_peeking");
        self.count -= 1;
        self.count == 0
    }

    /// True while any level of peek mode is active.
    #[inline]
    pub fn is_peeking(&self) -> bool {
        self.count > 0
    }

    /// Current nesting depth, for diagnostics.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.count
    }
}
