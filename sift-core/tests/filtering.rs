//! End-to-end filtering over real markup.

mod common;

use common::{collect, kinds, reader, start_names};
use pretty_assertions::assert_eq;
use sift_core::{filter, Error, EventKind, FilterSet, VecSource};

const SUBMISSION: &str = r#"<?xml version="1.0"?>
<qc:submission xmlns:qc="urn:qc">
  <qc:header id="42">
    <qc:title>Quarterly report</qc:title>
  </qc:header>
  <!-- generated -->
  <qc:body>
    <qc:item seq="1">first</qc:item>
    <qc:item seq="2">second</qc:item>
  </qc:body>
</qc:submission>
"#;

#[test]
fn unfiltered_stream_surfaces_the_whole_document() {
    use EventKind::*;
    let mut r = reader("<a>x</a>");
    let events = collect(&mut r);
    assert_eq!(
        kinds(&events),
        vec![StartDocument, StartElement, Characters, EndElement, EndDocument]
    );
}

#[test]
fn accept_filter_narrows_to_start_tags() {
    let mut r = reader(SUBMISSION);
    r.use_filter(filter::start_element());
    let events = collect(&mut r);
    assert_eq!(
        start_names(&events),
        vec!["submission", "header", "title", "body", "item", "item"]
    );
}

#[test]
fn stop_filter_hides_everything_past_the_boundary() {
    let fs = FilterSet::new().with_namespace("qc");
    let mut r = reader(SUBMISSION);
    r.use_filter(filter::start_element());
    r.use_stop_filter(fs.end_element("header"));
    let events = collect(&mut r);
    assert_eq!(start_names(&events), vec!["submission", "header", "title"]);
    assert!(r.is_stopped());
    // raw events remain past the boundary; the cursor just refuses them
    assert!(r.next_event().unwrap_err().is_exhausted());
}

#[test]
fn peek_is_idempotent_and_committed_by_next() {
    let fs = FilterSet::new().with_namespace("qc");
    let mut r = reader(SUBMISSION);
    r.use_filter(fs.start_element("item"));
    let peeked = r.peek().unwrap().unwrap();
    assert_eq!(r.peek().unwrap().unwrap(), peeked);
    let committed = r.next_event().unwrap();
    assert_eq!(committed, peeked);
    assert_eq!(committed.attribute_value("seq"), Some("1"));
}

#[test]
fn chain_completes_once_per_sequence() {
    let fs = FilterSet::new().with_namespace("qc");
    let mut r = reader(SUBMISSION);
    r.use_filter(filter::chain(vec![
        fs.start_element("header"),
        fs.start_element("item"),
    ]));
    // speculative lookahead must not commit chain progress
    let peeked = r.peek().unwrap().unwrap();
    assert_eq!(r.peek().unwrap().unwrap(), peeked);
    let hit = r.next_event().unwrap();
    assert_eq!(hit.attribute_value("seq"), Some("1"));
    // the chain restarts and needs another header first, so the second
    // item never matches
    assert!(r.next_event().unwrap_err().is_exhausted());
}

#[test]
fn skip_subtree_consumes_the_rest_of_the_current_element() {
    let fs = FilterSet::new().with_namespace("qc");
    let mut r = reader(SUBMISSION).with_namespace("qc");
    r.skip_to_start_element(&["header"]).unwrap();
    // swallow everything below <qc:header>; its own end tag arrives with
    // an empty stack and passes through
    let end = r.with_filter(filter::skip_subtree(), |r| r.next_event()).unwrap();
    assert!(end.is_end_element());
    assert_eq!(end.name(), Some(&fs.qname("header")));
    // cursor continues after the skipped subtree
    let next = r.next_start_element(&["body"]).unwrap();
    assert_eq!(next.name(), Some(&fs.qname("body")));
}

#[test]
fn next_tag_walks_over_insignificant_content() {
    let mut r = reader("<doc>\n  <!-- note -->\n  <child/>\n</doc>");
    r.next_start_element(&["doc"]).unwrap();
    let tag = r.next_tag().unwrap();
    assert!(tag.is_start_element());
    assert_eq!(tag.name().unwrap().local, "child");
    assert_eq!(tag.location().line, 3);
}

#[test]
fn next_tag_fails_on_real_text() {
    let mut r = reader("<doc>  oops  <child/></doc>");
    r.next_start_element(&["doc"]).unwrap();
    let err = r.next_tag().unwrap_err();
    assert!(matches!(err, Error::Corrupt { .. }), "got {err}");
    // fatal outcomes pass through the optional variant untouched
    let mut r = reader("<doc>oops</doc>");
    r.next_start_element(&["doc"]).unwrap();
    assert!(r.next_tag_opt().is_err());
}

#[test]
fn next_start_element_stops_at_an_unexpected_sibling() {
    let mut r = reader("<doc><other/><want/></doc>");
    r.next_start_element(&["doc"]).unwrap();
    assert!(r.next_start_element(&["want"]).unwrap_err().is_exhausted());
    assert!(r.is_stopped());
    // optional variant reads the same miss as absence
    assert_eq!(r.next_start_element_opt(&["want"]).unwrap(), None);
}

#[test]
fn skip_to_start_element_walks_over_siblings() {
    let mut r = reader("<doc><other>x</other><want/></doc>");
    r.next_start_element(&["doc"]).unwrap();
    let hit = r.skip_to_start_element(&["want"]).unwrap();
    assert_eq!(hit.name().unwrap().local, "want");
}

#[test]
fn element_text_concatenates_character_runs() {
    let mut r = reader("<a>hello<!-- gap -->, world</a>");
    r.next_start_element(&["a"]).unwrap();
    assert_eq!(r.element_text().unwrap(), "hello, world");
}

#[test]
fn element_text_fails_on_a_child_element() {
    let mut r = reader("<a>x<b/></a>");
    r.next_start_element(&["a"]).unwrap();
    let err = r.element_text().unwrap_err();
    assert!(matches!(err, Error::Corrupt { .. }), "got {err}");
}

#[test]
fn scoped_filters_are_restored_after_errors() {
    let fs = FilterSet::new().with_namespace("qc");
    let mut r = reader(SUBMISSION);
    r.use_filter(filter::named("ambient", filter::start_element()));
    // the miss exhausts the stream under the scoped filter
    let miss = r.with_filter(fs.start_element("missing"), |r| r.next_event());
    assert!(miss.unwrap_err().is_exhausted());
    assert!(r.to_string().contains("ambient"), "got {r}");
}

#[test]
fn next_matching_does_not_disturb_ambient_filters() {
    let fs = FilterSet::new().with_namespace("qc");
    let mut r = reader(SUBMISSION);
    r.use_filter(fs.start_element("item"));
    let title = r.next_matching(fs.start_element("title"), None).unwrap();
    assert_eq!(title.name().unwrap().local, "title");
    // ambient item filter back in force
    let item = r.next_event().unwrap();
    assert_eq!(item.attribute_value("seq"), Some("1"));
}

#[test]
fn attribute_filters_work_over_parsed_markup() {
    let mut r = reader(SUBMISSION);
    r.use_filter(filter::has_attribute("seq"));
    let events = collect(&mut r);
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.attribute_value("seq").is_some()));
}

#[test]
fn processing_directives_are_available_once_consumed() {
    let mut r = reader("<?fmt version=\"2\"?><doc><a/></doc>");
    r.use_filter(filter::start_element());
    let first = r.next_event().unwrap();
    assert_eq!(first.name().unwrap().local, "doc");
    // the prolog directive was walked over on the way to <doc>
    assert_eq!(r.directive("fmt"), Some("version=\"2\""));
    assert_eq!(r.directive("unknown"), None);
}

#[test]
fn replay_buffer_hands_out_independent_cursors() {
    let mut source = sift_core::XmlSource::new(SUBMISSION);
    let replay = VecSource::drain(&mut source, 64).unwrap();

    let fs = FilterSet::new().with_namespace("qc");
    let mut first = sift_core::FilteredReader::new(replay.clone());
    first.use_filter(fs.start_element("item"));
    let mut second = sift_core::FilteredReader::new(replay);
    second.use_filter(fs.start_element("title"));

    assert_eq!(first.events().count(), 2);
    assert_eq!(second.events().count(), 1);
}

#[test]
fn replay_cap_overflows_loudly() {
    let mut source = sift_core::XmlSource::new(SUBMISSION);
    let err = VecSource::drain(&mut source, 4).unwrap_err();
    assert!(matches!(err, Error::BufferOverflow(4)), "got {err}");
}

#[test]
fn malformed_markup_surfaces_as_a_parse_error_with_location() {
    let mut r = reader("<a>\n<b></a>");
    let err = r.events().find_map(Result::err).expect("stream must fail");
    match err {
        Error::Parse { location: Some(at), .. } => assert_eq!(at.line, 2),
        other => panic!("expected located parse error, got {other}"),
    }
}
