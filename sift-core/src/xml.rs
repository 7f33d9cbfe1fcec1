//! quick-xml adapter: a real markup tokenizer behind [`EventSource`].
//!
//! The adapter owns the impedance mismatch between quick-xml's event model
//! and the StAX-style stream the filters expect:
//!
//! - document boundary events are synthesized (`StartDocument` before the
//!   first token, `EndDocument` at EOF),
//! - empty elements (`<a/>`) expand into a start/end pair,
//! - CDATA folds into character runs,
//! - every event carries a line/column location, tracked incrementally
//!   from consumed input bytes.
//!
//! Malformed markup surfaces as a parse error with the failure location.
//! Constructs this layer has no representation for (entity references,
//! notably) are reported as unsupported rather than silently dropped.

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::event::{Attribute, Event, QName};
use crate::source::EventSource;
use crate::span::Location;

/// Pull cursor over an XML string, one-event lookahead included.
pub struct XmlSource<'a> {
    reader: Reader<&'a [u8]>,
    input: &'a [u8],
    lookahead: Option<Event>,
    /// End tag owed for an already-emitted empty element.
    pending_end: Option<(QName, Location)>,
    started: bool,
    finished: bool,
    line: u64,
    column: u64,
    consumed: usize,
}

impl<'a> XmlSource<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut reader = Reader::from_str(input);
        // mismatched end tags must surface as parse errors, not events
        reader.config_mut().check_end_names = true;
        Self {
            reader,
            input: input.as_bytes(),
            lookahead: None,
            pending_end: None,
            started: false,
            finished: false,
            line: 1,
            column: 1,
            consumed: 0,
        }
    }

    /// Position of the next unconsumed byte.
    pub fn location(&self) -> Location {
        Location { line: self.line, column: self.column, offset: self.consumed as u64 }
    }

    /// Advance line/column bookkeeping over everything the tokenizer has
    /// consumed since the last call.
    fn track_position(&mut self) {
        let pos = (self.reader.buffer_position() as usize).min(self.input.len());
        for &byte in &self.input[self.consumed..pos] {
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.consumed = pos;
    }

    fn start_element(&self, tag: &BytesStart<'_>, at: Location) -> Result<Event> {
        let name = QName::parse(&String::from_utf8_lossy(tag.name().as_ref()));
        let mut attributes = Vec::new();
        for attr in tag.attributes() {
            let attr = attr.map_err(|e| Error::parse(e.to_string(), Some(at)))?;
            let value = attr
                .unescape_value()
                .map_err(|e| Error::parse(e.to_string(), Some(at)))?;
            attributes.push(Attribute {
                name: QName::parse(&String::from_utf8_lossy(attr.key.as_ref())),
                value: value.into_owned(),
            });
        }
        Ok(Event::StartElement { name, attributes, location: at })
    }

    /// Produce the next event, or `None` once the document is complete.
    fn pull(&mut self) -> Result<Option<Event>> {
        if !self.started {
            self.started = true;
            return Ok(Some(Event::StartDocument { location: self.location() }));
        }
        if let Some((name, location)) = self.pending_end.take() {
            return Ok(Some(Event::EndElement { name, location }));
        }
        if self.finished {
            return Ok(None);
        }
        loop {
            let at = self.location();
            let token = self
                .reader
                .read_event()
                .map_err(|e| Error::parse(e.to_string(), Some(at)))?;
            self.track_position();
            match token {
                XmlEvent::Start(tag) => return Ok(Some(self.start_element(&tag, at)?)),
                XmlEvent::Empty(tag) => {
                    let event = self.start_element(&tag, at)?;
                    if let Event::StartElement { name, .. } = &event {
                        self.pending_end = Some((name.clone(), at));
                    }
                    return Ok(Some(event));
                }
                XmlEvent::End(tag) => {
                    let name = QName::parse(&String::from_utf8_lossy(tag.name().as_ref()));
                    return Ok(Some(Event::EndElement { name, location: at }));
                }
                XmlEvent::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::parse(e.to_string(), Some(at)))?
                        .into_owned();
                    return Ok(Some(Event::Characters { text, location: at }));
                }
                XmlEvent::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    return Ok(Some(Event::Characters { text, location: at }));
                }
                XmlEvent::Comment(text) => {
                    let text = String::from_utf8_lossy(&text).into_owned();
                    return Ok(Some(Event::Comment { text, location: at }));
                }
                XmlEvent::PI(pi) => {
                    let target = String::from_utf8_lossy(pi.target()).into_owned();
                    let content = String::from_utf8_lossy(pi.content()).into_owned();
                    let data = {
                        let trimmed = content.trim();
                        if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
                    };
                    return Ok(Some(Event::ProcessingInstruction { target, data, location: at }));
                }
                // the declaration is folded into the synthesized
                // StartDocument; doctype declarations carry nothing the
                // filtering layer inspects
                XmlEvent::Decl(_) | XmlEvent::DocType(_) => continue,
                XmlEvent::Eof => {
                    self.finished = true;
                    return Ok(Some(Event::EndDocument { location: at }));
                }
                _ => return Err(Error::Unsupported("entity references")),
            }
        }
    }
}

impl EventSource for XmlSource<'_> {
    fn peek_next(&mut self) -> Result<Option<&Event>> {
        if self.lookahead.is_none() {
            self.lookahead = self.pull()?;
        }
        Ok(self.lookahead.as_ref())
    }

    fn advance(&mut self) -> Result<Event> {
        if let Some(event) = self.lookahead.take() {
            return Ok(event);
        }
        self.pull()?.ok_or(Error::Exhausted)
    }
}
