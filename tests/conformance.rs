//! End-to-end event-sequence tests for the streaming parser.
//!
//! Each test feeds a literal document and asserts the exact recorded event
//! sequence, covering both fidelity modes, entity handling, the error
//! taxonomy, and the parser lifecycle.

#![allow(clippy::unwrap_used)]

mod common;

use common::{parse_events, RecordingHandler};
use pretty_assertions::assert_eq;
use saxoxide::{define_entity, CaseTransform, ParserOptions, SaxParser};

#[test]
fn test_simple_element_strict() {
    let events = parse_events("<x>y</x>", ParserOptions::default().strict(true));
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(x)",
            "opentag(x)",
            "text(y)",
            "closetag(x)",
            "end",
        ]
    );
}

#[test]
fn test_attributes_uppercase_transform() {
    let events = parse_events(
        "<span class=\"test\" hello=\"world\"></span>",
        ParserOptions::default().case_transform(CaseTransform::Uppercase),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(SPAN)",
            "attribute(CLASS=test)",
            "attribute(HELLO=world)",
            "opentag(SPAN, CLASS=test, HELLO=world)",
            "closetag(SPAN)",
            "end",
        ]
    );
}

#[test]
fn test_lowercase_transform() {
    let events = parse_events(
        "<R Attr=\"v\"/>",
        ParserOptions::default().case_transform(CaseTransform::Lowercase),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "attribute(attr=v)",
            "opentag(r, attr=v, selfclosing)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_strict_mode_preserves_case() {
    let events = parse_events(
        "<MiXeD/>",
        ParserOptions::default()
            .strict(true)
            .case_transform(CaseTransform::Lowercase),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(MiXeD)",
            "opentag(MiXeD, selfclosing)",
            "closetag(MiXeD)",
            "end",
        ]
    );
}

#[test]
fn test_cdata_fake_end_preserves_brackets() {
    // Eight `[` then ten `]` then `>`: the body keeps eight `]`.
    let events = parse_events(
        "<r><![CDATA[[[[[[[[[]]]]]]]]]]></r>",
        ParserOptions::default(),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r)",
            "opencdata",
            "cdata([[[[[[[[]]]]]]]])",
            "closecdata",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_entity_merge_single_text_event() {
    let events = parse_events(
        "<r>&rfloor; &spades; &copy; &rarr; &amp; &lt; < <  <   < &gt; &real; &weierp; &euro;</r>",
        ParserOptions::default(),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r)",
            "text(⌋ ♠ © → & < < <  <   < > ℜ ℘ €)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_numeric_entity_out_of_range_lenient() {
    for input in ["<r>&#1114112;</r>", "<r>&#-1;</r>", "<r>&#NaN;</r>"] {
        let events = parse_events(input, ParserOptions::default());
        let literal = &input[3..input.len() - 4];
        assert_eq!(
            events,
            vec![
                "ready".to_string(),
                "opentagstart(r)".to_string(),
                "opentag(r)".to_string(),
                format!("text({literal})"),
                "closetag(r)".to_string(),
                "end".to_string(),
            ]
        );
    }
}

#[test]
fn test_numeric_entity_out_of_range_strict() {
    for input in ["<r>&#1114112;</r>", "<r>&#-1;</r>", "<r>&#NaN;</r>"] {
        let events = parse_events(input, ParserOptions::default().strict(true));
        let literal = &input[3..input.len() - 4];
        assert_eq!(
            events,
            vec![
                "ready".to_string(),
                "opentagstart(r)".to_string(),
                "opentag(r)".to_string(),
                "error(Invalid character entity)".to_string(),
                format!("text({literal})"),
                "closetag(r)".to_string(),
                "end".to_string(),
            ]
        );
    }
}

#[test]
fn test_numeric_entities_valid() {
    let events = parse_events("<r a=\"&#65;&#x42;\">&#x1F602;</r>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "attribute(a=AB)",
            "opentag(r, a=AB)",
            "text(😂)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_doctype_event() {
    let events = parse_events("<!DOCTYPE html><r/>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "doctype( html)",
            "opentagstart(r)",
            "opentag(r, selfclosing)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_doctype_internal_subset_with_comment() {
    let events = parse_events(
        "<!DOCTYPE r [<!ENTITY x \"y\"><!-- note -->]><r/>",
        ParserOptions::default(),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "comment( note )",
            "doctype( r [<!ENTITY x \"y\">])",
            "opentagstart(r)",
            "opentag(r, selfclosing)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_second_doctype_is_error_in_strict() {
    let events = parse_events(
        "<!DOCTYPE a><!DOCTYPE b><r/>",
        ParserOptions::default().strict(true),
    );
    assert!(events.contains(&"error(Inappropriately located doctype declaration)".to_string()));
}

#[test]
fn test_processing_instruction() {
    let events = parse_events(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><r/>",
        ParserOptions::default(),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "pi(xml, version=\"1.0\" encoding=\"UTF-8\")",
            "opentagstart(r)",
            "opentag(r, selfclosing)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_processing_instruction_question_mark_in_body() {
    let events = parse_events("<r><?t a?b?></r>", ParserOptions::default());
    assert!(events.contains(&"pi(t, a?b)".to_string()));
}

#[test]
fn test_sgml_declaration_event() {
    let events = parse_events("<!ENTITY foo \"bar\"><r/>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "sgmldecl(ENTITY foo \"bar\")",
            "opentagstart(r)",
            "opentag(r, selfclosing)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_comment() {
    let events = parse_events("<r><!-- hello --></r>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r)",
            "comment( hello )",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_malformed_comment_lenient_continues() {
    let events = parse_events("<r><!-- a -- b --></r>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r)",
            "comment( a )",
            "comment(-- b )",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_malformed_comment_strict_errors() {
    let events = parse_events("<r><!-- a -- b --></r>", ParserOptions::default().strict(true));
    assert!(events.contains(&"error(Malformed comment)".to_string()));
}

#[test]
fn test_unencoded_angle_bracket_rewind() {
    let events = parse_events("<r>1 < 2</r>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r)",
            "text(1 < 2)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_unmatched_closing_tag_lenient_becomes_text() {
    let events = parse_events("<a></b></a>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(a)",
            "opentag(a)",
            "text(</b>)",
            "closetag(a)",
            "end",
        ]
    );
}

#[test]
fn test_unexpected_close_tag_closes_intervening() {
    let events = parse_events("<a><b></a>", ParserOptions::default().strict(true));
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(a)",
            "opentag(a)",
            "opentagstart(b)",
            "opentag(b)",
            "error(Unexpected close tag)",
            "closetag(b)",
            "closetag(a)",
            "end",
        ]
    );
}

#[test]
fn test_unexpected_close_tag_silent_in_lenient() {
    let events = parse_events("<a><b></a>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(a)",
            "opentag(a)",
            "opentagstart(b)",
            "opentag(b)",
            "closetag(b)",
            "closetag(a)",
            "end",
        ]
    );
}

#[test]
fn test_close_tag_trailing_whitespace() {
    let events = parse_events("<a></a  >", ParserOptions::default().strict(true));
    assert_eq!(
        events,
        vec!["ready", "opentagstart(a)", "opentag(a)", "closetag(a)", "end"]
    );
}

#[test]
fn test_attribute_without_value_lenient_uses_name() {
    let events = parse_events("<r attr></r>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "attribute(attr=attr)",
            "opentag(r, attr=attr)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_attribute_without_value_after_whitespace_is_empty() {
    let events = parse_events("<r a b=\"2\"></r>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "attribute(a=)",
            "attribute(b=2)",
            "opentag(r, a=, b=2)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_duplicate_attribute_dropped_silently() {
    let events = parse_events("<r a=\"1\" a=\"2\"/>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "attribute(a=1)",
            "opentag(r, a=1, selfclosing)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_unquoted_attribute_values_lenient_default() {
    let events = parse_events("<r a=1 b=two></r>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "attribute(a=1)",
            "attribute(b=two)",
            "opentag(r, a=1, b=two)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_unquoted_attribute_value_error_when_disabled() {
    let events = parse_events("<r a=1/>", ParserOptions::default().strict(true));
    assert!(events.contains(&"error(Unquoted attribute value)".to_string()));
}

#[test]
fn test_no_whitespace_between_attributes_strict() {
    let events = parse_events(
        "<r a=\"1\"b=\"2\"/>",
        ParserOptions::default().strict(true),
    );
    assert!(events.contains(&"error(No whitespace between attributes)".to_string()));
    assert!(events.contains(&"attribute(a=1)".to_string()));
    assert!(events.contains(&"attribute(b=2)".to_string()));
}

#[test]
fn test_non_whitespace_before_first_tag_strict() {
    let events = parse_events("x<r/>", ParserOptions::default().strict(true));
    assert_eq!(
        events,
        vec![
            "ready",
            "error(Non-whitespace before first tag)",
            "text(x)",
            "opentagstart(r)",
            "opentag(r, selfclosing)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_text_after_root_strict() {
    let events = parse_events("<r/>z", ParserOptions::default().strict(true));
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r, selfclosing)",
            "closetag(r)",
            "error(Text data outside of root node)",
            "text(z)",
            "end",
        ]
    );
}

#[test]
fn test_entity_invalid_character_in_name_lenient() {
    let events = parse_events("<r>&foo bar;</r>", ParserOptions::default());
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r)",
            "text(&foo bar;)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_strict_entities_reject_html_names() {
    let events = parse_events(
        "<r>&copy;</r>",
        ParserOptions::default().strict_entities(true),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r)",
            "text(&copy;)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_entity_in_attribute_value() {
    let events = parse_events("<r a=\"x &amp; y\"/>", ParserOptions::default());
    assert!(events.contains(&"attribute(a=x & y)".to_string()));
}

#[test]
fn test_user_defined_entity() {
    define_entity("conformance-greeting", "hi");
    let events = parse_events("<r>&conformance-greeting;</r>", ParserOptions::default());
    assert!(events.contains(&"text(hi)".to_string()));
}

#[test]
fn test_unparsed_entities_refeed_markup() {
    define_entity("conformance-wrapped", "<w>in</w>");
    let events = parse_events(
        "<r>&conformance-wrapped;</r>",
        ParserOptions::default().unparsed_entities(true),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r)",
            "opentagstart(w)",
            "opentag(w)",
            "text(in)",
            "closetag(w)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_unparsed_entities_never_refeed_predefined() {
    let events = parse_events(
        "<r>&lt;not a tag&gt;</r>",
        ParserOptions::default().unparsed_entities(true),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r)",
            "text(<not a tag>)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_bom_is_consumed() {
    let events = parse_events("\u{FEFF}<r/>", ParserOptions::default().strict(true));
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(r)",
            "opentag(r, selfclosing)",
            "closetag(r)",
            "end",
        ]
    );
}

#[test]
fn test_trim_and_normalize() {
    let events = parse_events(
        "<r>  a \t\n b  </r>",
        ParserOptions::default().trim(true).normalize(true),
    );
    assert!(events.contains(&"text(a b)".to_string()));
}

#[test]
fn test_whitespace_only_text_suppressed_with_trim() {
    let events = parse_events("<r> \t </r>", ParserOptions::default().trim(true));
    assert_eq!(
        events,
        vec!["ready", "opentagstart(r)", "opentag(r)", "closetag(r)", "end"]
    );
}

#[test]
fn test_cdata_bypasses_trim_and_normalize() {
    let events = parse_events(
        "<r><![CDATA[  a   b  ]]></r>",
        ParserOptions::default().trim(true).normalize(true),
    );
    assert!(events.contains(&"cdata(  a   b  )".to_string()));
}

#[test]
fn test_script_body_is_raw_text() {
    let events = parse_events(
        "<html><script>var x = \"</p>\" < 2;</script></html>",
        ParserOptions::default().allow_script(true),
    );
    assert_eq!(
        events,
        vec![
            "ready",
            "opentagstart(html)",
            "opentag(html)",
            "opentagstart(script)",
            "opentag(script)",
            "text(var x = \"</p>\" < 2;)",
            "closetag(script)",
            "closetag(html)",
            "end",
        ]
    );
}

#[test]
fn test_script_disabled_by_default() {
    let events = parse_events("<script>a</script>", ParserOptions::default());
    assert!(events.contains(&"text(a)".to_string()));
}

// -- Lifecycle --

#[test]
fn test_latched_error_raises_on_next_write_and_resume_clears() {
    let mut parser = SaxParser::new(
        ParserOptions::default().strict(true),
        RecordingHandler::default(),
    );
    parser.write_str("<x>a</y>").unwrap();
    let err = parser.write_str("more").unwrap_err();
    assert_eq!(err.message, "Unmatched closing tag");
    parser.resume();
    parser.write_str("</x>").unwrap();
    parser.end().unwrap();
    assert!(parser
        .handler()
        .events
        .contains(&"closetag(x)".to_string()));
}

#[test]
fn test_write_after_end_fails() {
    let mut parser = SaxParser::new(ParserOptions::default(), RecordingHandler::default());
    parser.write_str("<r/>").unwrap();
    parser.end().unwrap();
    let err = parser.write_str("<more/>").unwrap_err();
    assert_eq!(err.message, "Cannot write after close");
    let err = parser.end().unwrap_err();
    assert_eq!(err.message, "Cannot write after close");
}

#[test]
fn test_reset_reemits_ready_and_reparses() {
    let mut parser = SaxParser::new(ParserOptions::default(), RecordingHandler::default());
    parser.write_str("<a/>").unwrap();
    parser.end().unwrap();
    parser.reset();
    parser.write_str("<b/>").unwrap();
    parser.end().unwrap();
    let events = parser.into_handler().events;
    assert_eq!(events.iter().filter(|e| *e == "ready").count(), 2);
    assert_eq!(events.iter().filter(|e| *e == "end").count(), 2);
    assert!(events.contains(&"closetag(b)".to_string()));
}

#[test]
fn test_unclosed_root_strict() {
    let mut parser = SaxParser::new(
        ParserOptions::default().strict(true),
        RecordingHandler::default(),
    );
    parser.write_str("<r>").unwrap();
    parser.end().unwrap();
    assert!(parser
        .handler()
        .events
        .contains(&"error(Unclosed root tag)".to_string()));
}

#[test]
fn test_unexpected_end_mid_construct() {
    let mut parser = SaxParser::new(ParserOptions::default(), RecordingHandler::default());
    parser.write_str("<r><!-- unclosed").unwrap();
    parser.end().unwrap();
    assert!(parser
        .handler()
        .events
        .contains(&"error(Unexpected end)".to_string()));
}

#[test]
fn test_error_location_when_tracking() {
    let mut parser = SaxParser::new(
        ParserOptions::default().strict(true),
        RecordingHandler::default(),
    );
    parser.write_str("<x>\n</y>").unwrap();
    let diagnostic = &parser.diagnostics()[0];
    assert_eq!(diagnostic.message, "Unmatched closing tag");
    let location = diagnostic.location.unwrap();
    assert_eq!(location.line, 2);
    assert_eq!(location.column, 4);
    assert_eq!(location.offset, 8);
}

#[test]
fn test_no_error_location_without_tracking() {
    let mut parser = SaxParser::new(
        ParserOptions::default().strict(true).track_position(false),
        RecordingHandler::default(),
    );
    parser.write_str("<x></y>").unwrap();
    assert!(parser.diagnostics()[0].location.is_none());
}

#[test]
fn test_multibyte_position_counts_codepoints() {
    let mut parser = SaxParser::new(ParserOptions::default(), RecordingHandler::default());
    // "héé" is 3 codepoints but 5 UTF-8 bytes.
    parser.write_str("<r>héé</r>").unwrap();
    parser.end().unwrap();
    assert_eq!(parser.position(), 10);
}
