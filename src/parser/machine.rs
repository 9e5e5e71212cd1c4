//! The incremental lexical state machine.
//!
//! [`SaxParser`] is a push parser: the caller feeds consecutive chunks of
//! bytes (or text) through [`SaxParser::write`] / [`SaxParser::write_str`]
//! and the machine advances one codepoint at a time, firing handler events
//! as syntactic boundaries are crossed. Chunks may split tokens, tags, and
//! even multi-byte characters at arbitrary positions; the event sequence
//! for concatenated input equals the sequence for the single-call
//! equivalent.
//!
//! Three pieces keep memory bounded and copies low:
//!
//! - an incremental `encoding_rs` decoder that retains a partial trailing
//!   UTF-8 sequence between writes,
//! - bulk scanning with `memchr` so long text, CDATA, and script runs are
//!   appended in one copy instead of per codepoint,
//! - the buffer-overflow guard that partitions oversized text/CDATA into
//!   multiple events and turns any other oversized region into a soft
//!   error.

use std::fmt;
use std::mem;
use std::rc::Rc;

use encoding_rs::{CoderResult, Decoder, UTF_8};
use memchr::{memchr, memchr2};

use crate::entities;
use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError, SourceLocation};
use crate::parser::buffers::{BufferKind, Buffers};
use crate::parser::chars::{
    apply_text_options, is_attribute_end, is_entity_char, is_entity_start_char, is_name_char,
    is_name_start_char, is_quote, is_whitespace,
};
use crate::parser::namespace::{
    qname, NamespaceScope, XMLNS_NAMESPACE, XMLNS_PREFIX, XML_NAMESPACE, XML_PREFIX,
};
use crate::parser::state::State;
use crate::parser::{ParserOptions, MAX_ENTITY_DEPTH};
use crate::sax::{Attribute, NamespaceBinding, ProcessingInstruction, SaxHandler, Tag};

/// A streaming, push-based SAX parser.
///
/// Construct with a [`ParserOptions`] and a handler; the parser owns the
/// handler and invokes it synchronously from the feeding methods. One
/// parser instance is a single-threaded mutable object; run independent
/// parsers for disjoint streams when parallelism is needed.
///
/// # Examples
///
/// ```
/// use saxoxide::{DefaultHandler, ParserOptions, SaxParser};
///
/// let mut parser = SaxParser::new(ParserOptions::default(), DefaultHandler);
/// parser.write(b"<root>split ").unwrap();
/// parser.write(b"across chunks</root>").unwrap();
/// parser.end().unwrap();
/// ```
pub struct SaxParser<H: SaxHandler> {
    options: ParserOptions,
    handler: H,
    state: State,
    buffers: Buffers,
    decoder: Decoder,

    /// The pending tag between `on_open_tag_start` and `on_open_tag`.
    tag: Option<Tag>,
    /// Open elements, root first.
    tags: Vec<Tag>,
    /// Deferred `(name, value)` attributes (namespace mode only).
    attrib_list: Vec<(String, String)>,
    /// Bindings the pending tag introduces (namespace mode only).
    pending_bindings: Vec<(String, String)>,
    /// The scope active inside the innermost open element.
    scope: Rc<NamespaceScope>,
    root_scope: Rc<NamespaceScope>,

    quote: Option<char>,
    closed: bool,
    saw_root: bool,
    closed_root: bool,
    saw_doctype: bool,
    in_dtd: bool,
    in_script: bool,

    error: Option<ParseError>,
    diagnostics: Vec<ParseDiagnostic>,

    /// Absolute codepoint offset. Always maintained: the overflow guard
    /// and the "Unencoded <" rewind depend on it even when line/column
    /// tracking is off.
    position: u64,
    line: u64,
    column: u64,
    start_tag_position: u64,
    buffer_check_position: u64,
    entity_depth: usize,
}

impl<H: SaxHandler> SaxParser<H> {
    /// Creates a parser and emits `on_ready`.
    pub fn new(options: ParserOptions, handler: H) -> Self {
        let root_scope = NamespaceScope::root();
        let mut parser = Self {
            options,
            handler,
            state: State::Begin,
            buffers: Buffers::new(),
            decoder: UTF_8.new_decoder_without_bom_handling(),
            tag: None,
            tags: Vec::new(),
            attrib_list: Vec::new(),
            pending_bindings: Vec::new(),
            scope: Rc::clone(&root_scope),
            root_scope,
            quote: None,
            closed: false,
            saw_root: false,
            closed_root: false,
            saw_doctype: false,
            in_dtd: false,
            in_script: false,
            error: None,
            diagnostics: Vec::new(),
            position: 0,
            line: 1,
            column: 0,
            start_tag_position: 0,
            buffer_check_position: 0,
            entity_depth: 0,
        };
        parser.reset();
        parser
    }

    /// Returns the configured options.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Returns a shared reference to the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns a mutable reference to the handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consumes the parser and returns the handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// The latched soft error, if any. A latched error makes the next
    /// `write` fail until [`resume`](SaxParser::resume) clears it.
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// All diagnostics reported so far.
    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    /// Absolute codepoint offset consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Current 1-based line (meaningful when `track_position` is on).
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Current column in codepoints (meaningful when `track_position` is on).
    pub fn column(&self) -> u64 {
        self.column
    }

    /// Whether `end` has been called.
    pub fn closed(&self) -> bool {
        self.closed
    }

    // -- Feeding interface --

    /// Feeds a chunk of raw bytes (assumed UTF-8) into the parser.
    ///
    /// A partial trailing UTF-8 sequence is retained for the next chunk;
    /// malformed sequences decode to U+FFFD. Events fire synchronously
    /// before this method returns.
    ///
    /// # Errors
    ///
    /// Returns the latched error if a previous soft error is still pending,
    /// or "Cannot write after close" once [`end`](SaxParser::end) has run.
    /// Soft errors reported *during* this call go through `on_error` and
    /// latch for the next write instead.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        self.pre_write()?;
        let mut remaining = chunk;
        loop {
            let capacity = self
                .decoder
                .max_utf8_buffer_length(remaining.len())
                .unwrap_or(8192)
                .max(16);
            let mut decoded = String::with_capacity(capacity);
            let (result, read, _replaced) =
                self.decoder.decode_to_string(remaining, &mut decoded, false);
            self.consume(&decoded);
            remaining = &remaining[read..];
            if matches!(result, CoderResult::InputEmpty) {
                break;
            }
        }
        self.post_write();
        Ok(())
    }

    /// Feeds a chunk of text into the parser, bypassing byte decoding.
    ///
    /// # Errors
    ///
    /// Same conditions as [`write`](SaxParser::write).
    pub fn write_str(&mut self, chunk: &str) -> Result<(), ParseError> {
        self.pre_write()?;
        self.consume(chunk);
        self.post_write();
        Ok(())
    }

    /// Forces emission of buffered text and CDATA without requiring more
    /// input and without advancing the machine.
    pub fn flush(&mut self) {
        self.emit_text_if_any();
        if !self.buffers.cdata.is_empty() {
            let data = mem::take(&mut self.buffers.cdata);
            self.handler.on_cdata(&data);
        }
    }

    /// Asserts the input is complete: flushes the decoder, checks for an
    /// unclosed root (strict) and a mid-construct end (always), emits the
    /// final text event and `on_end`, and closes the parser.
    ///
    /// # Errors
    ///
    /// Returns "Cannot write after close" if the parser is already closed.
    pub fn end(&mut self) -> Result<(), ParseError> {
        if self.closed {
            return Err(self.closed_error());
        }
        // Flush a dangling partial UTF-8 sequence, if any.
        let capacity = self.decoder.max_utf8_buffer_length(0).unwrap_or(16).max(16);
        let mut decoded = String::with_capacity(capacity);
        let (_result, _read, _replaced) = self.decoder.decode_to_string(&[], &mut decoded, true);
        if !decoded.is_empty() {
            self.consume(&decoded);
        }

        if self.saw_root && !self.closed_root {
            self.strict_fail("Unclosed root tag");
        }
        if !matches!(
            self.state,
            State::Begin | State::BeginWhitespace | State::Text
        ) {
            self.fail("Unexpected end");
        }
        self.emit_text_if_any();
        self.closed = true;
        self.handler.on_end();
        Ok(())
    }

    /// Clears the latched error so the next `write` proceeds.
    pub fn resume(&mut self) {
        self.error = None;
    }

    /// Returns the parser to its initial state (same options, same
    /// handler) and re-emits `on_ready`.
    pub fn reset(&mut self) {
        self.buffers.clear_all();
        self.state = State::Begin;
        self.decoder = UTF_8.new_decoder_without_bom_handling();
        self.tag = None;
        self.tags.clear();
        self.attrib_list.clear();
        self.pending_bindings.clear();
        self.scope = Rc::clone(&self.root_scope);
        self.quote = None;
        self.closed = false;
        self.saw_root = false;
        self.closed_root = false;
        self.saw_doctype = false;
        self.in_dtd = false;
        self.in_script = false;
        self.error = None;
        self.diagnostics.clear();
        self.position = 0;
        self.line = 1;
        self.column = 0;
        self.start_tag_position = 0;
        self.buffer_check_position = buffer_cap_u64(self.options.max_buffer_length);
        self.entity_depth = 0;
        self.handler.on_ready();
    }

    fn pre_write(&mut self) -> Result<(), ParseError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.closed {
            return Err(self.closed_error());
        }
        Ok(())
    }

    fn post_write(&mut self) {
        if self.position >= self.buffer_check_position {
            self.check_buffer_length();
        }
    }

    fn closed_error(&self) -> ParseError {
        ParseError {
            message: "Cannot write after close".to_string(),
            location: self.location(),
        }
    }

    // -- Position tracking --

    fn location(&self) -> Option<SourceLocation> {
        self.options.track_position.then_some(SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.position,
        })
    }

    fn advance_char(&mut self, c: char) {
        self.position += 1;
        if self.options.track_position {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    fn advance_run(&mut self, run: &str) {
        let codepoints = run.chars().count() as u64;
        self.position += codepoints;
        if !self.options.track_position {
            return;
        }
        match run.rfind('\n') {
            Some(last) => {
                self.line += run.bytes().filter(|&b| b == b'\n').count() as u64;
                self.column = run[last + 1..].chars().count() as u64;
            }
            None => self.column += codepoints,
        }
    }

    // -- Error reporting --

    /// Reports a soft error: emits `on_error`, records a diagnostic, and
    /// latches so the next `write` raises until `resume`.
    fn fail(&mut self, message: &str) {
        let error = ParseError {
            message: message.to_string(),
            location: self.location(),
        };
        self.diagnostics.push(ParseDiagnostic {
            severity: ErrorSeverity::Error,
            message: message.to_string(),
            location: error.location,
        });
        self.handler.on_error(&error);
        self.error = Some(error);
    }

    /// Reports a soft error in strict mode only.
    fn strict_fail(&mut self, message: &str) {
        if self.options.strict {
            self.fail(message);
        }
    }

    // -- Event helpers --

    /// Closes the current text region: applies trim/normalize, emits
    /// `on_text` iff the result is non-empty, and clears the buffer. Every
    /// non-text event emission calls this first, preserving the one-text-
    /// event-per-region guarantee.
    fn emit_text_if_any(&mut self) {
        if self.buffers.text_node.is_empty() {
            return;
        }
        let raw = mem::take(&mut self.buffers.text_node);
        let text = apply_text_options(&raw, self.options.trim, self.options.normalize);
        if !text.is_empty() {
            self.handler.on_text(&text);
        }
    }

    // -- The main loop --

    /// Consumes a decoded chunk, one codepoint at a time, with bulk scans
    /// for plain runs in text-like states.
    fn consume(&mut self, data: &str) {
        let bytes = data.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let stop = match self.state {
                State::Text if self.saw_root && !self.closed_root => {
                    Some(memchr2(b'<', b'&', &bytes[i..]).unwrap_or(bytes.len() - i))
                }
                State::Cdata => Some(memchr(b']', &bytes[i..]).unwrap_or(bytes.len() - i)),
                State::Script => Some(memchr(b'<', &bytes[i..]).unwrap_or(bytes.len() - i)),
                _ => None,
            };
            if let Some(run_len) = stop {
                if run_len > 0 {
                    let run = &data[i..i + run_len];
                    match self.state {
                        State::Cdata => self.buffers.cdata.push_str(run),
                        _ => self.buffers.text_node.push_str(run),
                    }
                    self.advance_run(run);
                    i += run_len;
                    if i >= bytes.len() {
                        break;
                    }
                }
            }
            // One codepoint through the automaton. `i` is always on a char
            // boundary: runs end right before an ASCII delimiter.
            let Some(c) = data[i..].chars().next() else {
                break;
            };
            i += c.len_utf8();
            self.advance_char(c);
            self.step(c);
        }
    }

    /// Transitions the automaton on a single codepoint.
    #[allow(clippy::too_many_lines)]
    fn step(&mut self, c: char) {
        match self.state {
            State::Begin => {
                self.state = State::BeginWhitespace;
                if c == '\u{FEFF}' {
                    return;
                }
                self.begin_whitespace(c);
            }

            State::BeginWhitespace => self.begin_whitespace(c),

            State::Text => {
                if c == '<' && !(self.saw_root && self.closed_root && !self.options.strict) {
                    self.state = State::OpenWaka;
                    self.start_tag_position = self.position;
                } else {
                    if !is_whitespace(c) && (!self.saw_root || self.closed_root) {
                        self.strict_fail("Text data outside of root node");
                    }
                    if c == '&' {
                        self.state = State::TextEntity;
                    } else {
                        self.buffers.text_node.push(c);
                    }
                }
            }

            State::OpenWaka => {
                if c == '!' {
                    self.state = State::SgmlDecl;
                    self.buffers.sgml_decl.clear();
                } else if is_whitespace(c) {
                    // wait for it...
                } else if is_name_start_char(c) {
                    self.state = State::OpenTag;
                    self.buffers.tag_name.clear();
                    self.buffers.tag_name.push(c);
                } else if c == '/' {
                    self.state = State::CloseTag;
                    self.buffers.tag_name.clear();
                } else if c == '?' {
                    self.state = State::ProcInst;
                    self.buffers.proc_inst_name.clear();
                    self.buffers.proc_inst_body.clear();
                } else {
                    self.strict_fail("Unencoded <");
                    // Rewind: restore the `<` and any whitespace padding
                    // consumed since it, then fall back to text.
                    self.buffers.text_node.push('<');
                    if self.start_tag_position + 1 < self.position {
                        let pad = (self.position - self.start_tag_position - 1) as usize;
                        for _ in 0..pad {
                            self.buffers.text_node.push(' ');
                        }
                    }
                    self.buffers.text_node.push(c);
                    self.state = State::Text;
                }
            }

            State::SgmlDecl => self.sgml_decl(c),

            State::SgmlDeclQuoted => {
                if Some(c) == self.quote {
                    self.state = State::SgmlDecl;
                    self.quote = None;
                }
                self.buffers.sgml_decl.push(c);
            }

            State::Doctype => {
                if c == '>' {
                    self.state = State::Text;
                    let doctype = mem::take(&mut self.buffers.doctype);
                    self.emit_text_if_any();
                    self.handler.on_doctype(&doctype);
                    self.saw_doctype = true;
                } else {
                    self.buffers.doctype.push(c);
                    if c == '[' {
                        self.state = State::DoctypeDtd;
                        self.in_dtd = true;
                    } else if is_quote(c) {
                        self.state = State::DoctypeQuoted;
                        self.quote = Some(c);
                    }
                }
            }

            State::DoctypeQuoted => {
                self.buffers.doctype.push(c);
                if Some(c) == self.quote {
                    self.quote = None;
                    self.state = State::Doctype;
                }
            }

            State::DoctypeDtd => {
                if c == ']' {
                    self.buffers.doctype.push(c);
                    self.in_dtd = false;
                    self.state = State::Doctype;
                } else if c == '<' {
                    // `<!…>` declarations and `<?…?>` instructions inside
                    // the internal subset route back through OPEN_WAKA.
                    self.state = State::OpenWaka;
                    self.start_tag_position = self.position;
                } else if is_quote(c) {
                    self.buffers.doctype.push(c);
                    self.quote = Some(c);
                    self.state = State::DoctypeDtdQuoted;
                } else {
                    self.buffers.doctype.push(c);
                }
            }

            State::DoctypeDtdQuoted => {
                self.buffers.doctype.push(c);
                if Some(c) == self.quote {
                    self.state = State::DoctypeDtd;
                    self.quote = None;
                }
            }

            State::Comment => {
                if c == '-' {
                    self.state = State::CommentEnding;
                } else {
                    self.buffers.comment.push(c);
                }
            }

            State::CommentEnding => {
                if c == '-' {
                    self.state = State::CommentEnded;
                    let raw = mem::take(&mut self.buffers.comment);
                    let comment =
                        apply_text_options(&raw, self.options.trim, self.options.normalize);
                    if !comment.is_empty() {
                        self.emit_text_if_any();
                        self.handler.on_comment(&comment);
                    }
                } else {
                    self.buffers.comment.push('-');
                    self.buffers.comment.push(c);
                    self.state = State::Comment;
                }
            }

            State::CommentEnded => {
                if c == '>' {
                    self.state = if self.in_dtd {
                        State::DoctypeDtd
                    } else {
                        State::Text
                    };
                } else {
                    self.strict_fail("Malformed comment");
                    self.buffers.comment.push_str("--");
                    self.buffers.comment.push(c);
                    self.state = State::Comment;
                }
            }

            State::Cdata => {
                if c == ']' {
                    self.state = State::CdataEnding;
                } else {
                    self.buffers.cdata.push(c);
                }
            }

            State::CdataEnding => {
                if c == ']' {
                    self.state = State::CdataEnding2;
                } else {
                    self.buffers.cdata.push(']');
                    self.buffers.cdata.push(c);
                    self.state = State::Cdata;
                }
            }

            State::CdataEnding2 => {
                if c == '>' {
                    if !self.buffers.cdata.is_empty() {
                        let data = mem::take(&mut self.buffers.cdata);
                        self.emit_text_if_any();
                        self.handler.on_cdata(&data);
                    }
                    self.emit_text_if_any();
                    self.handler.on_close_cdata();
                    self.state = State::Text;
                } else if c == ']' {
                    self.buffers.cdata.push(']');
                } else {
                    self.buffers.cdata.push_str("]]");
                    self.buffers.cdata.push(c);
                    self.state = State::Cdata;
                }
            }

            State::ProcInst => {
                if c == '?' {
                    self.state = State::ProcInstEnding;
                } else if is_whitespace(c) {
                    self.state = State::ProcInstBody;
                } else {
                    self.buffers.proc_inst_name.push(c);
                }
            }

            State::ProcInstBody => {
                if self.buffers.proc_inst_body.is_empty() && is_whitespace(c) {
                    // skip leading whitespace
                } else if c == '?' {
                    self.state = State::ProcInstEnding;
                } else {
                    self.buffers.proc_inst_body.push(c);
                }
            }

            State::ProcInstEnding => {
                if c == '>' {
                    let pi = ProcessingInstruction {
                        name: mem::take(&mut self.buffers.proc_inst_name),
                        body: mem::take(&mut self.buffers.proc_inst_body),
                    };
                    self.emit_text_if_any();
                    self.handler.on_processing_instruction(&pi);
                    self.state = if self.in_dtd {
                        State::DoctypeDtd
                    } else {
                        State::Text
                    };
                } else {
                    self.buffers.proc_inst_body.push('?');
                    self.buffers.proc_inst_body.push(c);
                    self.state = State::ProcInstBody;
                }
            }

            State::OpenTag => {
                if is_name_char(c) {
                    self.buffers.tag_name.push(c);
                } else {
                    self.new_tag();
                    if c == '>' {
                        self.open_tag(false);
                    } else if c == '/' {
                        self.state = State::OpenTagSlash;
                    } else {
                        if !is_whitespace(c) {
                            self.strict_fail("Invalid character in tag name");
                        }
                        self.state = State::Attribute;
                    }
                }
            }

            State::OpenTagSlash => {
                if c == '>' {
                    self.open_tag(true);
                    self.close_tag();
                } else {
                    self.strict_fail("Forward-slash in opening tag not followed by >");
                    self.state = State::Attribute;
                }
            }

            State::Attribute => {
                if is_whitespace(c) {
                    // between attributes
                } else if c == '>' {
                    self.open_tag(false);
                } else if c == '/' {
                    self.state = State::OpenTagSlash;
                } else if is_name_start_char(c) {
                    self.buffers.attribute_name.clear();
                    self.buffers.attribute_name.push(c);
                    self.buffers.attribute_value.clear();
                    self.state = State::AttributeName;
                } else {
                    self.strict_fail("Invalid attribute name");
                }
            }

            State::AttributeName => {
                if c == '=' {
                    self.state = State::AttributeValue;
                } else if c == '>' {
                    self.strict_fail("Attribute without value");
                    self.buffers.attribute_value = self.buffers.attribute_name.clone();
                    self.process_attribute();
                    self.open_tag(false);
                } else if is_whitespace(c) {
                    self.state = State::AttributeNameSawWhite;
                } else if is_name_char(c) {
                    self.buffers.attribute_name.push(c);
                } else {
                    self.strict_fail("Invalid attribute name");
                }
            }

            State::AttributeNameSawWhite => {
                if c == '=' {
                    self.state = State::AttributeValue;
                } else if is_whitespace(c) {
                    // still waiting for `=`
                } else {
                    self.strict_fail("Attribute without value");
                    self.buffers.attribute_value.clear();
                    self.process_attribute();
                    if c == '>' {
                        self.open_tag(false);
                    } else if is_name_start_char(c) {
                        self.buffers.attribute_name.clear();
                        self.buffers.attribute_name.push(c);
                        self.state = State::AttributeName;
                    } else {
                        self.strict_fail("Invalid attribute name");
                        self.state = State::Attribute;
                    }
                }
            }

            State::AttributeValue => {
                if is_whitespace(c) {
                    // skip whitespace between `=` and the value
                } else if is_quote(c) {
                    self.quote = Some(c);
                    self.state = State::AttributeValueQuoted;
                } else {
                    if !self.options.unquoted_attribute_values_enabled() {
                        self.fail("Unquoted attribute value");
                    }
                    self.state = State::AttributeValueUnquoted;
                    self.buffers.attribute_value.push(c);
                }
            }

            State::AttributeValueQuoted => {
                if Some(c) != self.quote {
                    if c == '&' {
                        self.state = State::AttributeValueEntityQ;
                    } else {
                        self.buffers.attribute_value.push(c);
                    }
                } else {
                    self.process_attribute();
                    self.quote = None;
                    self.state = State::AttributeValueClosed;
                }
            }

            State::AttributeValueClosed => {
                if is_whitespace(c) {
                    self.state = State::Attribute;
                } else if c == '>' {
                    self.open_tag(false);
                } else if c == '/' {
                    self.state = State::OpenTagSlash;
                } else if is_name_start_char(c) {
                    self.strict_fail("No whitespace between attributes");
                    self.buffers.attribute_name.clear();
                    self.buffers.attribute_name.push(c);
                    self.buffers.attribute_value.clear();
                    self.state = State::AttributeName;
                } else {
                    self.strict_fail("Invalid attribute name");
                }
            }

            State::AttributeValueUnquoted => {
                if !is_attribute_end(c) {
                    if c == '&' {
                        self.state = State::AttributeValueEntityU;
                    } else {
                        self.buffers.attribute_value.push(c);
                    }
                } else {
                    self.process_attribute();
                    if c == '>' {
                        self.open_tag(false);
                    } else {
                        self.state = State::Attribute;
                    }
                }
            }

            State::CloseTag => {
                if self.buffers.tag_name.is_empty() {
                    if is_whitespace(c) {
                        // leading whitespace tolerated
                    } else if !is_name_start_char(c) {
                        if self.in_script {
                            self.buffers.text_node.push_str("</");
                            self.buffers.text_node.push(c);
                            self.state = State::Script;
                        } else {
                            self.strict_fail("Invalid tagname in closing tag");
                        }
                    } else {
                        self.buffers.tag_name.push(c);
                    }
                } else if c == '>' {
                    self.close_tag();
                } else if is_name_char(c) {
                    self.buffers.tag_name.push(c);
                } else if self.in_script {
                    self.buffers.text_node.push_str("</");
                    let name = mem::take(&mut self.buffers.tag_name);
                    self.buffers.text_node.push_str(&name);
                    self.buffers.text_node.push(c);
                    self.state = State::Script;
                } else {
                    if !is_whitespace(c) {
                        self.strict_fail("Invalid characters in closing tag");
                    }
                    self.state = State::CloseTagSawWhite;
                }
            }

            State::CloseTagSawWhite => {
                if is_whitespace(c) {
                    // trailing whitespace tolerated
                } else if c == '>' {
                    self.close_tag();
                } else {
                    self.strict_fail("Invalid characters in closing tag");
                }
            }

            State::TextEntity | State::AttributeValueEntityQ | State::AttributeValueEntityU => {
                self.entity(c);
            }

            State::Script => {
                if c == '<' {
                    self.state = State::ScriptEnding;
                } else {
                    self.buffers.text_node.push(c);
                }
            }

            State::ScriptEnding => {
                if c == '/' {
                    self.state = State::CloseTag;
                    self.buffers.tag_name.clear();
                } else {
                    self.buffers.text_node.push('<');
                    self.buffers.text_node.push(c);
                    self.state = State::Script;
                }
            }
        }
    }

    fn begin_whitespace(&mut self, c: char) {
        if c == '<' {
            self.state = State::OpenWaka;
            self.start_tag_position = self.position;
        } else if !is_whitespace(c) {
            self.strict_fail("Non-whitespace before first tag");
            self.buffers.text_node.push(c);
            self.state = State::Text;
        }
    }

    fn sgml_decl(&mut self, c: char) {
        if self.buffers.sgml_decl.len() < 7 {
            let acc: String = self
                .buffers
                .sgml_decl
                .chars()
                .chain(std::iter::once(c))
                .collect();
            let upper = acc.to_ascii_uppercase();
            if upper == "[CDATA[" {
                self.emit_text_if_any();
                self.handler.on_open_cdata();
                self.state = State::Cdata;
                self.buffers.sgml_decl.clear();
                self.buffers.cdata.clear();
                return;
            }
            if upper == "--" {
                self.state = State::Comment;
                self.buffers.comment.clear();
                self.buffers.sgml_decl.clear();
                return;
            }
            if upper == "DOCTYPE" {
                self.state = State::Doctype;
                if self.saw_doctype || self.saw_root {
                    self.strict_fail("Inappropriately located doctype declaration");
                }
                self.buffers.doctype.clear();
                self.buffers.sgml_decl.clear();
                return;
            }
        }
        if c == '>' {
            if self.in_dtd {
                // A markup declaration inside the internal subset is kept
                // verbatim in the doctype body.
                let decl = mem::take(&mut self.buffers.sgml_decl);
                self.buffers.doctype.push_str("<!");
                self.buffers.doctype.push_str(&decl);
                self.buffers.doctype.push('>');
                self.state = State::DoctypeDtd;
            } else {
                let decl = mem::take(&mut self.buffers.sgml_decl);
                self.emit_text_if_any();
                self.handler.on_sgml_declaration(&decl);
                self.state = State::Text;
            }
        } else if is_quote(c) {
            self.state = State::SgmlDeclQuoted;
            self.quote = Some(c);
            self.buffers.sgml_decl.push(c);
        } else {
            self.buffers.sgml_decl.push(c);
        }
    }

    // -- Entities --

    /// Handles one codepoint inside `&…;`, in text or an attribute value.
    fn entity(&mut self, c: char) {
        let (return_state, into_attribute) = match self.state {
            State::AttributeValueEntityQ => (State::AttributeValueQuoted, true),
            State::AttributeValueEntityU => (State::AttributeValueUnquoted, true),
            _ => (State::Text, false),
        };
        if c == ';' {
            let name = mem::take(&mut self.buffers.entity);
            match entities::resolve(&name, self.options.strict, self.options.strict_entities) {
                Some(value) => {
                    self.state = return_state;
                    if self.options.unparsed_entities
                        && !entities::is_predefined_replacement(&value)
                    {
                        self.refeed(&value, into_attribute);
                    } else {
                        self.append_resolved(into_attribute, &value);
                    }
                }
                None => {
                    self.strict_fail("Invalid character entity");
                    self.append_resolved(into_attribute, &format!("&{name};"));
                    self.state = return_state;
                }
            }
        } else if (self.buffers.entity.is_empty() && is_entity_start_char(c))
            || (!self.buffers.entity.is_empty() && is_entity_char(c))
        {
            self.buffers.entity.push(c);
        } else {
            self.strict_fail("Invalid character in entity name");
            let name = mem::take(&mut self.buffers.entity);
            self.append_resolved(into_attribute, &format!("&{name}{c}"));
            self.state = return_state;
        }
    }

    fn append_resolved(&mut self, into_attribute: bool, value: &str) {
        if into_attribute {
            self.buffers.attribute_value.push_str(value);
        } else {
            self.buffers.text_node.push_str(value);
        }
    }

    /// Re-feeds entity replacement text through the machine
    /// (`unparsed_entities`), bounded by an expansion-depth limit.
    fn refeed(&mut self, text: &str, into_attribute: bool) {
        if self.entity_depth >= MAX_ENTITY_DEPTH {
            self.fail("Entity expansion depth exceeded");
            self.append_resolved(into_attribute, text);
            return;
        }
        self.entity_depth += 1;
        self.consume(text);
        self.entity_depth -= 1;
    }

    // -- Tags --

    /// Commits the accumulated tag name to a pending tag and emits
    /// `on_open_tag_start`.
    fn new_tag(&mut self) {
        let name = self.options.transform_name(&self.buffers.tag_name);
        self.buffers.tag_name = name.clone();
        let mut tag = Tag {
            name,
            ..Tag::default()
        };
        if self.options.namespaces {
            tag.ns = Some(Rc::clone(&self.scope));
        }
        self.pending_bindings.clear();
        self.attrib_list.clear();
        self.emit_text_if_any();
        self.handler.on_open_tag_start(&tag);
        self.tag = Some(tag);
    }

    /// Finishes one attribute: applies case transform, drops duplicates,
    /// records namespace bindings, and either emits immediately or defers
    /// until `open_tag` resolves the element's scope.
    fn process_attribute(&mut self) {
        let name = self.options.transform_name(&self.buffers.attribute_name);
        self.buffers.attribute_name.clear();
        let value = mem::take(&mut self.buffers.attribute_value);

        let duplicate = self.attrib_list.iter().any(|(n, _)| n == &name)
            || self
                .tag
                .as_ref()
                .is_some_and(|tag| tag.attributes.iter().any(|a| a.name == name));
        if duplicate {
            return;
        }

        if self.options.namespaces {
            let (prefix, local) = qname(&name);
            if prefix == XMLNS_PREFIX {
                if local == XML_PREFIX && value != XML_NAMESPACE {
                    self.strict_fail(&format!("xml: prefix must be bound to {XML_NAMESPACE}"));
                } else if local == XMLNS_PREFIX && value != XMLNS_NAMESPACE {
                    self.strict_fail(&format!("xmlns: prefix must be bound to {XMLNS_NAMESPACE}"));
                } else {
                    self.pending_bindings.push((local, value.clone()));
                }
            }
            self.attrib_list.push((name, value));
        } else {
            let attribute = Attribute {
                name,
                value,
                ..Attribute::default()
            };
            if let Some(tag) = self.tag.as_mut() {
                tag.attributes.push(attribute.clone());
            }
            self.emit_text_if_any();
            self.handler.on_attribute(&attribute);
        }
    }

    /// Completes the pending open tag: resolves namespaces, emits deferred
    /// binding and attribute events, pushes the tag, and emits
    /// `on_open_tag`.
    fn open_tag(&mut self, self_closing: bool) {
        let Some(mut tag) = self.tag.take() else {
            return;
        };

        if self.options.namespaces {
            let element_scope = if self.pending_bindings.is_empty() {
                Rc::clone(&self.scope)
            } else {
                NamespaceScope::child(&self.scope, mem::take(&mut self.pending_bindings))
            };
            let introduces_scope = !Rc::ptr_eq(&element_scope, &self.scope);
            tag.ns = Some(Rc::clone(&element_scope));

            let (prefix, local) = qname(&tag.name);
            tag.prefix = prefix;
            tag.local_name = local;
            tag.uri = element_scope.get(&tag.prefix).unwrap_or("").to_string();
            if !tag.prefix.is_empty() && tag.uri.is_empty() {
                self.strict_fail("Unbound namespace prefix");
                tag.uri = tag.prefix.clone();
            }

            if introduces_scope {
                let bindings: Vec<NamespaceBinding> = element_scope
                    .own_bindings()
                    .iter()
                    .map(|(prefix, uri)| NamespaceBinding {
                        prefix: prefix.clone(),
                        uri: uri.clone(),
                    })
                    .collect();
                for binding in &bindings {
                    self.emit_text_if_any();
                    self.handler.on_open_namespace(binding);
                }
            }

            for (name, value) in mem::take(&mut self.attrib_list) {
                let (prefix, local) = qname(&name);
                let uri = if prefix.is_empty() {
                    // Unprefixed attributes never inherit the default
                    // namespace.
                    String::new()
                } else {
                    element_scope.get(&prefix).unwrap_or("").to_string()
                };
                let mut attribute = Attribute {
                    name,
                    value,
                    prefix,
                    local_name: local,
                    uri,
                };
                if !attribute.prefix.is_empty()
                    && attribute.prefix != XMLNS_PREFIX
                    && attribute.uri.is_empty()
                {
                    self.strict_fail("Unbound namespace prefix");
                    attribute.uri = attribute.prefix.clone();
                }
                tag.attributes.push(attribute.clone());
                self.emit_text_if_any();
                self.handler.on_attribute(&attribute);
            }

            self.scope = element_scope;
        }

        tag.is_self_closing = self_closing;
        self.saw_root = true;
        self.emit_text_if_any();
        self.handler.on_open_tag(&tag);
        self.tags.push(tag);

        if !self_closing {
            if self.options.allow_script
                && !self.options.strict
                && self.buffers.tag_name.eq_ignore_ascii_case("script")
            {
                self.state = State::Script;
                self.in_script = true;
            } else {
                self.state = State::Text;
            }
            self.buffers.tag_name.clear();
        }
        self.buffers.attribute_name.clear();
        self.buffers.attribute_value.clear();
        self.attrib_list.clear();
    }

    /// Closes tags from the stack top down to the accumulated name,
    /// emitting close-tag and close-namespace events per pop.
    fn close_tag(&mut self) {
        if self.buffers.tag_name.is_empty() {
            self.strict_fail("Weird empty close tag");
            self.buffers.text_node.push_str("</>");
            self.state = State::Text;
            return;
        }

        let name = self.options.transform_name(&self.buffers.tag_name);

        if self.in_script {
            if !name.eq_ignore_ascii_case("script") {
                // Not the script terminator; the would-be close tag is
                // script text.
                self.buffers.text_node.push_str("</");
                let raw = mem::take(&mut self.buffers.tag_name);
                self.buffers.text_node.push_str(&raw);
                self.buffers.text_node.push('>');
                self.state = State::Script;
                return;
            }
            self.in_script = false;
        }

        let Some(target) = self.tags.iter().rposition(|open| open.name == name) else {
            self.strict_fail("Unmatched closing tag");
            self.buffers.text_node.push_str("</");
            self.buffers.text_node.push_str(&name);
            self.buffers.text_node.push('>');
            self.state = State::Text;
            return;
        };

        for _ in 0..(self.tags.len() - 1 - target) {
            self.strict_fail("Unexpected close tag");
        }

        while self.tags.len() > target {
            let Some(tag) = self.tags.pop() else {
                break;
            };
            self.emit_text_if_any();
            self.handler.on_close_tag(&tag.name);

            if self.options.namespaces {
                let parent_scope = self
                    .tags
                    .last()
                    .and_then(|open| open.ns.clone())
                    .unwrap_or_else(|| Rc::clone(&self.root_scope));
                if let Some(tag_scope) = &tag.ns {
                    if !Rc::ptr_eq(tag_scope, &parent_scope) {
                        for (prefix, uri) in tag_scope.own_bindings() {
                            let binding = NamespaceBinding {
                                prefix: prefix.clone(),
                                uri: uri.clone(),
                            };
                            self.handler.on_close_namespace(&binding);
                        }
                    }
                }
                self.scope = parent_scope;
            }
        }

        if target == 0 {
            self.closed_root = true;
        }
        self.buffers.tag_name.clear();
        self.buffers.attribute_name.clear();
        self.buffers.attribute_value.clear();
        self.attrib_list.clear();
        self.state = State::Text;
    }

    // -- Buffer overflow policy --

    /// Inspects every region buffer once the scheduled position has been
    /// crossed. Text and CDATA flush a partial event; any other oversized
    /// region is a soft error. The next check is scheduled at the earliest
    /// position a subsequent overrun could occur.
    fn check_buffer_length(&mut self) {
        let max_allowed = self.options.max_buffer_length.max(10);
        let mut max_actual = 0usize;
        for kind in BufferKind::ALL {
            if self.buffers.len(kind) > max_allowed {
                match kind {
                    BufferKind::TextNode => self.emit_text_if_any(),
                    BufferKind::Cdata => {
                        let data = mem::take(&mut self.buffers.cdata);
                        self.handler.on_cdata(&data);
                    }
                    _ => self.fail(&format!("Max buffer length exceeded: {}", kind.name())),
                }
            }
            max_actual = max_actual.max(self.buffers.len(kind));
        }
        let headroom = self.options.max_buffer_length.saturating_sub(max_actual);
        self.buffer_check_position = self.position.saturating_add(buffer_cap_u64(headroom));
    }
}

/// Converts a buffer cap to the `u64` position domain without overflow
/// when the check is disabled via `usize::MAX`.
fn buffer_cap_u64(cap: usize) -> u64 {
    u64::try_from(cap).unwrap_or(u64::MAX)
}

impl<H: SaxHandler> fmt::Debug for SaxParser<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaxParser")
            .field("state", &self.state)
            .field("position", &self.position)
            .field("depth", &self.tags.len())
            .field("closed", &self.closed)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
