//! Filter composition: atomic predicates and boolean combinators.
//!
//! A [`Filter`] is a peek-aware predicate over events. The shape of a
//! filter is a closed union fixed at construction time - atomic predicate,
//! negation, aggregate and/or, sequential chain, subtree skip, or a named
//! wrapper - so evaluation and the peek protocol are plain recursion over
//! the variants, with no downcasting.
//!
//! Aggregates deliberately do **not** short-circuit: every sub-filter sees
//! every event, so stateful members observe the stream consistently no
//! matter where the boolean result was already decided. The empty
//! aggregate accepts everything, for `any` as well as `all` - a documented
//! convention, not an inference.

use std::fmt;
use std::sync::Arc;

use crate::chain::Chain;
use crate::error::Result;
use crate::event::{Event, EventKind, QName};
use crate::skip::SkipSubtree;

type Predicate = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// A composable, peek-aware predicate over events.
pub enum Filter {
    /// Stateless predicate; peek operations are no-ops.
    Atomic { label: String, predicate: Predicate },
    /// Negation; peek-transparent.
    Not(Box<Filter>),
    /// Non-short-circuit AND over every member.
    All(Vec<Filter>),
    /// Non-short-circuit OR over every member.
    Any(Vec<Filter>),
    /// Sequential multi-stage matcher.
    Chain(Chain),
    /// Balanced subtree skipper.
    Skip(SkipSubtree),
    /// Diagnostic label around another filter; behaviour unchanged.
    Named { label: String, inner: Box<Filter> },
}

impl Filter {
    /// Evaluate this filter against an event.
    ///
    /// Stateful variants consult their peek depth internally; callers only
    /// bracket lookaheads with [`start_peeking`](Self::start_peeking) /
    /// [`stop_peeking`](Self::stop_peeking).
    pub fn accept(&mut self, event: &Event) -> Result<bool> {
        match self {
            Filter::Atomic { predicate, .. } => Ok(predicate(event)),
            Filter::Not(inner) => Ok(!inner.accept(event)?),
            Filter::All(members) => {
                let mut verdict = true;
                for member in members.iter_mut() {
                    verdict &= member.accept(event)?;
                }
                Ok(verdict)
            }
            Filter::Any(members) => {
                if members.is_empty() {
                    return Ok(true);
                }
                let mut verdict = false;
                for member in members.iter_mut() {
                    verdict |= member.accept(event)?;
                }
                Ok(verdict)
            }
            Filter::Chain(chain) => chain.accept(event),
            Filter::Skip(skip) => skip.accept(event),
            Filter::Named { inner, .. } => inner.accept(event),
        }
    }

    /// Enter peek mode, recursively for every stateful member.
    pub fn start_peeking(&mut self) {
        match self {
            Filter::Atomic { .. } => {}
            Filter::Not(inner) | Filter::Named { inner, .. } => inner.start_peeking(),
            Filter::All(members) | Filter::Any(members) => {
                members.iter_mut().for_each(Filter::start_peeking)
            }
            Filter::Chain(chain) => chain.start_peeking(),
            Filter::Skip(skip) => skip.start_peeking(),
        }
    }

    /// Leave peek mode. Panics on an unmatched call, see [`crate::peek`].
    pub fn stop_peeking(&mut self) {
        match self {
            Filter::Atomic { .. } => {}
            Filter::Not(inner) | Filter::Named { inner, .. } => inner.stop_peeking(),
            Filter::All(members) | Filter::Any(members) => {
                members.iter_mut().for_each(Filter::stop_peeking)
            }
            Filter::Chain(chain) => chain.stop_peeking(),
            Filter::Skip(skip) => skip.stop_peeking(),
        }
    }

    /// True while any stateful member is in peek mode. Purely stateless
    /// compositions always answer false - they have nothing to protect.
    pub fn is_peeking(&self) -> bool {
        match self {
            Filter::Atomic { .. } => false,
            Filter::Not(inner) | Filter::Named { inner, .. } => inner.is_peeking(),
            Filter::All(members) | Filter::Any(members) => {
                members.iter().any(Filter::is_peeking)
            }
            Filter::Chain(chain) => chain.is_peeking(),
            Filter::Skip(skip) => skip.is_peeking(),
        }
    }
}

impl Clone for Filter {
    fn clone(&self) -> Self {
        match self {
            Filter::Atomic { label, predicate } => Filter::Atomic {
                label: label.clone(),
                predicate: Arc::clone(predicate),
            },
            Filter::Not(inner) => Filter::Not(inner.clone()),
            Filter::All(members) => Filter::All(members.clone()),
            Filter::Any(members) => Filter::Any(members.clone()),
            Filter::Chain(chain) => Filter::Chain(chain.clone()),
            Filter::Skip(skip) => Filter::Skip(skip.clone()),
            Filter::Named { label, inner } => Filter::Named {
                label: label.clone(),
                inner: inner.clone(),
            },
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, members: &[Filter]) -> fmt::Result {
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{member}")?;
            }
            Ok(())
        }
        match self {
            Filter::Atomic { label, .. } => f.write_str(label),
            Filter::Not(inner) => write!(f, "not{{{inner}}}"),
            Filter::All(members) => {
                write!(f, "all[")?;
                list(f, members)?;
                write!(f, "]")
            }
            Filter::Any(members) => {
                write!(f, "any[")?;
                list(f, members)?;
                write!(f, "]")
            }
            Filter::Chain(chain) => write!(f, "{chain}"),
            Filter::Skip(skip) => write!(f, "{skip}"),
            Filter::Named { label, .. } => f.write_str(label),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ============================================================================
// Atomic constructors
// ============================================================================

/// Lift a plain predicate into the filter protocol with no-op peek hooks.
pub fn from_fn(
    label: impl Into<String>,
    predicate: impl Fn(&Event) -> bool + Send + Sync + 'static,
) -> Filter {
    Filter::Atomic { label: label.into(), predicate: Arc::new(predicate) }
}

/// Accept every event.
pub fn always() -> Filter {
    from_fn("true", |_| true)
}

/// Accept events of one kind.
pub fn event_kind(kind: EventKind) -> Filter {
    from_fn(format!("eventKind{{{kind}}}"), move |e| e.kind() == kind)
}

/// Accept any start tag.
pub fn start_element() -> Filter {
    from_fn("startElement", Event::is_start_element)
}

/// Accept any end tag.
pub fn end_element() -> Filter {
    from_fn("endElement", Event::is_end_element)
}

/// Accept any character run.
pub fn characters() -> Filter {
    from_fn("characters", Event::is_characters)
}

/// Accept whitespace-only character runs.
pub fn whitespace() -> Filter {
    from_fn("whitespace", Event::is_whitespace)
}

/// Accept comments.
pub fn comment() -> Filter {
    event_kind(EventKind::Comment)
}

/// Accept processing instructions.
pub fn processing_instruction() -> Filter {
    event_kind(EventKind::ProcessingInstruction)
}

/// Accept start or end tags carrying this name.
pub fn element(name: impl Into<QName>) -> Filter {
    let name = name.into();
    from_fn(format!("element{{{name}}}"), move |e| e.name() == Some(&name))
}

/// Accept the start tag of the named element.
pub fn start_of(name: impl Into<QName>) -> Filter {
    let name = name.into();
    named(
        format!("startElement{{{name}}}"),
        all(vec![start_element(), element(name)]),
    )
}

/// Accept the end tag of the named element.
pub fn end_of(name: impl Into<QName>) -> Filter {
    let name = name.into();
    named(
        format!("endElement{{{name}}}"),
        all(vec![end_element(), element(name)]),
    )
}

/// Accept start tags that carry at least one attribute.
pub fn has_attributes() -> Filter {
    from_fn("hasAttributes", |e| e.attributes().is_some_and(|a| !a.is_empty()))
}

/// Accept start tags carrying the named attribute.
pub fn has_attribute(name: impl Into<QName>) -> Filter {
    let name = name.into();
    from_fn(format!("withAttribute{{{name}}}"), move |e| {
        e.attribute_value(name.clone()).is_some()
    })
}

// ============================================================================
// Combinators
// ============================================================================

/// Negate a filter. Peek calls pass straight through to the inner filter.
pub fn not(filter: Filter) -> Filter {
    Filter::Not(Box::new(filter))
}

/// All members must accept. Empty input accepts everything; a single
/// member is returned unwrapped.
pub fn all(filters: Vec<Filter>) -> Filter {
    aggregate(filters, Filter::All)
}

/// Any member may accept. Empty input accepts everything (same convention
/// as [`all`]); a single member is returned unwrapped.
pub fn any(filters: Vec<Filter>) -> Filter {
    aggregate(filters, Filter::Any)
}

fn aggregate(mut filters: Vec<Filter>, wrap: fn(Vec<Filter>) -> Filter) -> Filter {
    match filters.len() {
        0 => always(),
        1 => filters.remove(0),
        _ => wrap(filters),
    }
}

/// Attach a diagnostic label. A filter that already carries a label is
/// relabelled in place rather than wrapped twice.
pub fn named(label: impl Into<String>, filter: Filter) -> Filter {
    match filter {
        Filter::Named { inner, .. } => Filter::Named { label: label.into(), inner },
        other => Filter::Named { label: label.into(), inner: Box::new(other) },
    }
}

/// Sequential matcher over the ordered stages. See [`Chain`].
pub fn chain(stages: Vec<Filter>) -> Filter {
    Filter::Chain(Chain::new(stages))
}

/// Balanced subtree skipper. See [`SkipSubtree`].
pub fn skip_subtree() -> Filter {
    Filter::Skip(SkipSubtree::new())
}

// ============================================================================
// Namespace-aware builder
// ============================================================================

/// Builds name filters qualified with a default namespace.
///
/// ```
/// use sift_core::filter::FilterSet;
///
/// let fs = FilterSet::new().with_namespace("qc");
/// let f = fs.start_element("submission"); // matches <qc:submission>
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    namespace: Option<String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Qualify a local name with the configured namespace.
    pub fn qname(&self, local: impl Into<String>) -> QName {
        QName { namespace: self.namespace.clone(), local: local.into() }
    }

    /// Start or end tag of the named element.
    pub fn element(&self, local: impl Into<String>) -> Filter {
        element(self.qname(local))
    }

    /// Start tag of the named element.
    pub fn start_element(&self, local: impl Into<String>) -> Filter {
        start_of(self.qname(local))
    }

    /// Start tag of any *other* element.
    pub fn start_element_not(&self, local: impl Into<String>) -> Filter {
        let name = self.qname(local);
        named(
            format!("startElementNot{{{name}}}"),
            all(vec![start_element(), not(element(name))]),
        )
    }

    /// End tag of the named element.
    pub fn end_element(&self, local: impl Into<String>) -> Filter {
        end_of(self.qname(local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Attribute;
    use crate::span::Location;

    fn start(name: &str, attrs: &[(&str, &str)]) -> Event {
        Event::StartElement {
            name: name.into(),
            attributes: attrs.iter().map(|(n, v)| Attribute::new(*n, *v)).collect(),
            location: Location::start(),
        }
    }

    fn end(name: &str) -> Event {
        Event::EndElement { name: name.into(), location: Location::start() }
    }

    fn chars(text: &str) -> Event {
        Event::Characters { text: text.into(), location: Location::start() }
    }

    #[test]
    fn atomic_predicates() {
        assert!(start_element().accept(&start("a", &[])).unwrap());
        assert!(!start_element().accept(&end("a")).unwrap());
        assert!(end_of("a").accept(&end("a")).unwrap());
        assert!(!end_of("a").accept(&end("b")).unwrap());
        assert!(whitespace().accept(&chars("  ")).unwrap());
        assert!(!whitespace().accept(&chars("x")).unwrap());
        assert!(has_attribute("id").accept(&start("a", &[("id", "1")])).unwrap());
        assert!(!has_attribute("id").accept(&start("a", &[])).unwrap());
        assert!(has_attributes().accept(&start("a", &[("id", "1")])).unwrap());
        assert!(!has_attributes().accept(&start("a", &[])).unwrap());
    }

    #[test]
    fn element_matches_both_tag_directions() {
        let mut f = element("a");
        assert!(f.accept(&start("a", &[])).unwrap());
        assert!(f.accept(&end("a")).unwrap());
        assert!(!f.accept(&chars("a")).unwrap());
    }

    #[test]
    fn boolean_combinators() {
        let mut f = all(vec![start_element(), element("a")]);
        assert!(f.accept(&start("a", &[])).unwrap());
        assert!(!f.accept(&end("a")).unwrap());

        let mut f = any(vec![element("a"), element("b")]);
        assert!(f.accept(&start("b", &[])).unwrap());
        assert!(!f.accept(&start("c", &[])).unwrap());

        let mut f = not(element("a"));
        assert!(!f.accept(&start("a", &[])).unwrap());
        assert!(f.accept(&start("b", &[])).unwrap());
    }

    #[test]
    fn empty_aggregates_accept_everything() {
        // documented convention for both, not inferred correctness
        assert!(all(vec![]).accept(&chars("x")).unwrap());
        assert!(any(vec![]).accept(&chars("x")).unwrap());
        assert!(Filter::Any(vec![]).accept(&chars("x")).unwrap());
        assert!(Filter::All(vec![]).accept(&chars("x")).unwrap());
    }

    #[test]
    fn single_member_aggregate_degrades_to_the_member() {
        let f = all(vec![start_element()]);
        assert_eq!(f.to_string(), "startElement");
        let f = any(vec![element("a")]);
        assert_eq!(f.to_string(), "element{a}");
    }

    #[test]
    fn named_relabels_in_place() {
        let f = named("first", start_element());
        let f = named("second", f);
        assert_eq!(f.to_string(), "second");
        match f {
            Filter::Named { inner, .. } => assert_eq!(inner.to_string(), "startElement"),
            other => panic!("expected named wrapper, got {other}"),
        }
    }

    #[test]
    fn display_renders_structure() {
        let f = all(vec![start_element(), not(element("a"))]);
        assert_eq!(f.to_string(), "all[startElement, not{element{a}}]");
        assert_eq!(skip_subtree().to_string(), "skipSubtree{stack=[], peeks=0}");
    }

    #[test]
    fn filter_set_qualifies_names() {
        let fs = FilterSet::new().with_namespace("qc");
        let mut f = fs.start_element("item");
        assert!(f.accept(&start("qc:item", &[])).unwrap());
        assert!(!f.accept(&start("item", &[])).unwrap());

        let mut not_item = fs.start_element_not("item");
        assert!(not_item.accept(&start("other", &[])).unwrap());
        assert!(!not_item.accept(&start("qc:item", &[])).unwrap());
        assert!(!not_item.accept(&end("other")).unwrap());
    }

    #[test]
    fn peek_delegation_reaches_stateful_members() {
        let mut f = any(vec![start_element(), skip_subtree()]);
        assert!(!f.is_peeking());
        f.start_peeking();
        assert!(f.is_peeking());
        f.stop_peeking();
        assert!(!f.is_peeking());
    }

    #[test]
    fn aggregates_evaluate_every_member() {
        // the skip member must observe the start tag even though the
        // boolean verdict is already decided by the first member
        let mut f = any(vec![start_element(), skip_subtree()]);
        f.accept(&start("a", &[])).unwrap();
        let mut f2 = match f {
            Filter::Any(members) => members,
            _ => unreachable!(),
        };
        match &f2.remove(1) {
            Filter::Skip(skip) => assert_eq!(skip.depth(), 1),
            _ => unreachable!(),
        }
    }
}
