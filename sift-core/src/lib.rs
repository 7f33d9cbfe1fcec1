//! Sift Core
//!
//! Composable, peek-safe filtering over pull-based XML event streams.
//! Filters decide per event what a cursor surfaces, without building a
//! tree and without unbounded buffering.
//!
//! # Architecture
//!
//! - **span.rs** - Location type (line/column/offset)
//! - **event.rs** - Event enum, qualified names, attributes
//! - **error.rs** - Error taxonomy (exhausted vs. corrupt vs. parse)
//! - **peek.rs** - Reference-counted peek depth
//! - **filter.rs** - Filter union, combinators, namespace-aware builders
//! - **chain.rs** - Sequential matcher over a cyclic stage queue
//! - **skip.rs** - Balanced-subtree suppression
//! - **source.rs** - EventSource contract, in-memory replay buffer
//! - **xml.rs** - quick-xml tokenizer adapter
//! - **reader.rs** - The filtered cursor and its pull operations

pub mod chain;
pub mod error;
pub mod event;
pub mod filter;
pub mod peek;
pub mod reader;
pub mod skip;
pub mod source;
pub mod span;
pub mod xml;

pub use chain::Chain;
pub use error::{Error, Result};
pub use event::{Attribute, Event, EventKind, QName};
pub use filter::{Filter, FilterSet};
pub use peek::PeekDepth;
pub use reader::{Events, FilteredReader};
pub use skip::SkipSubtree;
pub use source::{EventSource, VecSource};
pub use span::Location;
pub use xml::XmlSource;
