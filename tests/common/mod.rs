//! Shared test support: a handler that records every event as a string.

// Each integration-test binary compiles this module; not every binary uses
// every helper.
#![allow(dead_code)]

use std::fmt::Write as _;

use saxoxide::{
    Attribute, NamespaceBinding, ParseError, ParserOptions, ProcessingInstruction, SaxHandler,
    SaxParser, Tag,
};

/// Records every event in a human-comparable textual form.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub events: Vec<String>,
}

fn format_tag(tag: &Tag) -> String {
    let mut out = tag.name.clone();
    for attribute in &tag.attributes {
        let _ = write!(out, ", {}={}", attribute.name, attribute.value);
    }
    if tag.is_self_closing {
        out.push_str(", selfclosing");
    }
    out
}

impl SaxHandler for RecordingHandler {
    fn on_ready(&mut self) {
        self.events.push("ready".to_string());
    }

    fn on_text(&mut self, text: &str) {
        self.events.push(format!("text({text})"));
    }

    fn on_open_tag_start(&mut self, tag: &Tag) {
        self.events.push(format!("opentagstart({})", format_tag(tag)));
    }

    fn on_attribute(&mut self, attribute: &Attribute) {
        let mut event = format!("attribute({}={}", attribute.name, attribute.value);
        if !attribute.prefix.is_empty() || !attribute.uri.is_empty() {
            let _ = write!(
                event,
                ", prefix={}, local={}, uri={}",
                attribute.prefix, attribute.local_name, attribute.uri
            );
        }
        event.push(')');
        self.events.push(event);
    }

    fn on_open_tag(&mut self, tag: &Tag) {
        self.events.push(format!("opentag({})", format_tag(tag)));
    }

    fn on_close_tag(&mut self, name: &str) {
        self.events.push(format!("closetag({name})"));
    }

    fn on_open_cdata(&mut self) {
        self.events.push("opencdata".to_string());
    }

    fn on_cdata(&mut self, text: &str) {
        self.events.push(format!("cdata({text})"));
    }

    fn on_close_cdata(&mut self) {
        self.events.push("closecdata".to_string());
    }

    fn on_comment(&mut self, text: &str) {
        self.events.push(format!("comment({text})"));
    }

    fn on_doctype(&mut self, text: &str) {
        self.events.push(format!("doctype({text})"));
    }

    fn on_processing_instruction(&mut self, pi: &ProcessingInstruction) {
        self.events.push(format!("pi({}, {})", pi.name, pi.body));
    }

    fn on_sgml_declaration(&mut self, text: &str) {
        self.events.push(format!("sgmldecl({text})"));
    }

    fn on_open_namespace(&mut self, binding: &NamespaceBinding) {
        self.events
            .push(format!("opennamespace({}={})", binding.prefix, binding.uri));
    }

    fn on_close_namespace(&mut self, binding: &NamespaceBinding) {
        self.events
            .push(format!("closenamespace({}={})", binding.prefix, binding.uri));
    }

    fn on_error(&mut self, error: &ParseError) {
        self.events.push(format!("error({})", error.message));
    }

    fn on_end(&mut self) {
        self.events.push("end".to_string());
    }
}

/// Parses `input` in one write and returns the recorded events.
pub fn parse_events(input: &str, options: ParserOptions) -> Vec<String> {
    parse_events_chunked(&[input], options)
}

/// Parses `chunks` through successive writes and returns the recorded
/// events. Panics on a hard write failure (latched errors from a previous
/// chunk included), so callers exercising latching drive the parser
/// directly.
pub fn parse_events_chunked(chunks: &[&str], options: ParserOptions) -> Vec<String> {
    let mut parser = SaxParser::new(options, RecordingHandler::default());
    for chunk in chunks {
        parser.write_str(chunk).unwrap();
    }
    parser.end().unwrap();
    parser.into_handler().events
}
