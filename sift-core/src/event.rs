//! Markup events - the unit of everything this crate filters.
//!
//! This is a StAX-style pull model: the source hands out one event at a
//! time and filters decide which of them a caller gets to see. Events are
//! owned and immutable; the filtering layer only inspects kind, name and
//! attributes, it never rewrites them.
//!
//! # Event sequences
//!
//! `<a href="x">hi</a>` pulls as:
//! ```text
//! StartDocument
//! StartElement { name: a, attributes: [href="x"] }
//! Characters { text: "hi" }
//! EndElement { name: a }
//! EndDocument
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::span::Location;

/// A qualified element or attribute name.
///
/// `namespace` is the optional qualifier as it appears in the markup.
/// Matching throughout this crate is structural equality; resolving
/// prefixes to URIs is the tokenizer's concern, not ours.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    /// A name with an explicit namespace qualifier.
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self { namespace: Some(namespace.into()), local: local.into() }
    }

    /// An unqualified name.
    pub fn local(local: impl Into<String>) -> Self {
        Self { namespace: None, local: local.into() }
    }

    /// Parse `ns:local` into a qualified name, or treat the whole string
    /// as local when there is no separator.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((ns, local)) => Self::new(ns, local),
            None => Self::local(raw),
        }
    }
}

impl From<&str> for QName {
    fn from(raw: &str) -> Self {
        QName::parse(raw)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// An attribute on a start-element event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<QName>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Field-less discriminant for [`Event`], used by kind-matching filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StartDocument,
    EndDocument,
    StartElement,
    EndElement,
    Characters,
    Comment,
    ProcessingInstruction,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::StartDocument => "START_DOCUMENT",
            EventKind::EndDocument => "END_DOCUMENT",
            EventKind::StartElement => "START_ELEMENT",
            EventKind::EndElement => "END_ELEMENT",
            EventKind::Characters => "CHARACTERS",
            EventKind::Comment => "COMMENT",
            EventKind::ProcessingInstruction => "PROCESSING_INSTRUCTION",
        };
        f.write_str(name)
    }
}

/// One unit of the markup token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Document boundary before any content.
    StartDocument { location: Location },

    /// Document boundary after all content.
    EndDocument { location: Location },

    /// Start tag with its attributes: `<name a="1">`.
    StartElement {
        name: QName,
        attributes: Vec<Attribute>,
        location: Location,
    },

    /// End tag: `</name>`. Empty elements expand to a start/end pair.
    EndElement { name: QName, location: Location },

    /// A run of character data (text or CDATA).
    Characters { text: String, location: Location },

    /// Comment: `<!-- ... -->`.
    Comment { text: String, location: Location },

    /// Processing instruction: `<?target data?>`.
    ProcessingInstruction {
        target: String,
        data: Option<String>,
        location: Location,
    },
}

impl Event {
    /// The discriminant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StartDocument { .. } => EventKind::StartDocument,
            Event::EndDocument { .. } => EventKind::EndDocument,
            Event::StartElement { .. } => EventKind::StartElement,
            Event::EndElement { .. } => EventKind::EndElement,
            Event::Characters { .. } => EventKind::Characters,
            Event::Comment { .. } => EventKind::Comment,
            Event::ProcessingInstruction { .. } => EventKind::ProcessingInstruction,
        }
    }

    /// The source position of this event.
    pub fn location(&self) -> Location {
        match self {
            Event::StartDocument { location }
            | Event::EndDocument { location }
            | Event::StartElement { location, .. }
            | Event::EndElement { location, .. }
            | Event::Characters { location, .. }
            | Event::Comment { location, .. }
            | Event::ProcessingInstruction { location, .. } => *location,
        }
    }

    #[inline]
    pub fn is_start_element(&self) -> bool {
        matches!(self, Event::StartElement { .. })
    }

    #[inline]
    pub fn is_end_element(&self) -> bool {
        matches!(self, Event::EndElement { .. })
    }

    #[inline]
    pub fn is_characters(&self) -> bool {
        matches!(self, Event::Characters { .. })
    }

    /// True for a character run made entirely of XML whitespace.
    pub fn is_whitespace(&self) -> bool {
        match self {
            Event::Characters { text, .. } => {
                text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            }
            _ => false,
        }
    }

    /// Element name for start and end tags, `None` for everything else.
    pub fn name(&self) -> Option<&QName> {
        match self {
            Event::StartElement { name, .. } | Event::EndElement { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Attributes of a start tag, `None` for other kinds.
    pub fn attributes(&self) -> Option<&[Attribute]> {
        match self {
            Event::StartElement { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    /// Look up an attribute value on a start tag by name.
    pub fn attribute_value(&self, name: impl Into<QName>) -> Option<&str> {
        let name = name.into();
        self.attributes()?
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Collect a start tag's attributes into a map keyed by local name.
    ///
    /// Later attributes win on a local-name collision, which can only
    /// happen across namespaces.
    pub fn attribute_map(&self) -> HashMap<String, String> {
        self.attributes()
            .unwrap_or(&[])
            .iter()
            .map(|a| (a.name.local.clone(), a.value.clone()))
            .collect()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::StartDocument { .. } => write!(f, "<document>"),
            Event::EndDocument { .. } => write!(f, "</document>"),
            Event::StartElement { name, .. } => write!(f, "<{name}>"),
            Event::EndElement { name, .. } => write!(f, "</{name}>"),
            Event::Characters { text, .. } => write!(f, "chars({:?})", text),
            Event::Comment { text, .. } => write!(f, "comment({:?})", text),
            Event::ProcessingInstruction { target, .. } => write!(f, "<?{target}?>"),
        }
    }
}
