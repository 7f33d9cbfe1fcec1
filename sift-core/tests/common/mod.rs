#![allow(dead_code)]

use sift_core::{Event, EventKind, FilteredReader, XmlSource};

/// Filtered cursor over an in-memory document.
pub fn reader(input: &str) -> FilteredReader<XmlSource<'_>> {
    FilteredReader::new(XmlSource::new(input))
}

pub fn kinds(events: &[Event]) -> Vec<EventKind> {
    events.iter().map(Event::kind).collect()
}

/// Local names of the start tags in a slice of events.
pub fn start_names(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.is_start_element())
        .filter_map(|e| e.name().map(|n| n.local.clone()))
        .collect()
}

pub fn collect(reader: &mut FilteredReader<XmlSource<'_>>) -> Vec<Event> {
    reader.events().map(|e| e.expect("stream error")).collect()
}
