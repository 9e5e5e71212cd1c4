//! SAX-style streaming event handler API.
//!
//! SAX (Simple API for XML) is a streaming, event-driven API for processing
//! XML. Instead of building a tree in memory, the parser fires callbacks as
//! it encounters tags, text, comments, and other constructs.
//!
//! This is useful for large or unbounded inputs where building a full tree
//! would be wasteful, or when you only need to extract specific data.
//!
//! # Examples
//!
//! ```
//! use saxoxide::{ParserOptions, SaxHandler, SaxParser, Tag};
//!
//! #[derive(Default)]
//! struct ElementCounter {
//!     count: usize,
//! }
//!
//! impl SaxHandler for ElementCounter {
//!     fn on_open_tag(&mut self, _tag: &Tag) {
//!         self.count += 1;
//!     }
//! }
//!
//! let mut parser = SaxParser::new(ParserOptions::default(), ElementCounter::default());
//! parser.write_str("<root><a/><b/><c/></root>").unwrap();
//! parser.end().unwrap();
//! assert_eq!(parser.handler().count, 4);
//! ```

use std::rc::Rc;

use crate::error::ParseError;
use crate::parser::namespace::NamespaceScope;

/// An element tag.
///
/// Created when the lexer commits a tag name, populated with attributes as
/// they are parsed, and delivered through [`SaxHandler::on_open_tag_start`]
/// and [`SaxHandler::on_open_tag`]. The `prefix`, `local_name`, and `uri`
/// fields are filled in only when namespace processing is enabled; an
/// unresolved or disabled namespace leaves them empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tag {
    /// The (possibly case-normalized) qualified tag name.
    pub name: String,
    /// Attributes in document order. Duplicate names were discarded.
    pub attributes: Vec<Attribute>,
    /// Whether the tag ended with `/>`.
    pub is_self_closing: bool,
    /// Namespace prefix (empty when unprefixed or namespaces are off).
    pub prefix: String,
    /// Local part of the name (empty when namespaces are off).
    pub local_name: String,
    /// Resolved namespace URI (empty when unresolved or namespaces are off).
    pub uri: String,
    /// The namespace scope active inside this tag.
    pub(crate) ns: Option<Rc<NamespaceScope>>,
}

impl Tag {
    /// Resolves a namespace prefix against the scope active inside this
    /// tag. The empty prefix resolves the default namespace. Returns `None`
    /// when namespace processing is disabled or the prefix is unbound.
    #[must_use]
    pub fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        self.ns.as_ref().and_then(|ns| ns.get(prefix))
    }
}

/// A single attribute of an element tag.
///
/// The `prefix`, `local_name`, and `uri` fields are filled in only when
/// namespace processing is enabled. Unprefixed attributes never inherit the
/// default namespace, so their `uri` stays empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attribute {
    /// The (possibly case-normalized) qualified attribute name.
    pub name: String,
    /// The attribute value with entities resolved.
    pub value: String,
    /// Namespace prefix (empty when unprefixed or namespaces are off).
    pub prefix: String,
    /// Local part of the name (empty when namespaces are off).
    pub local_name: String,
    /// Resolved namespace URI (empty for unprefixed attributes).
    pub uri: String,
}

/// A processing instruction, e.g. `<?target data?>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessingInstruction {
    /// The PI target name.
    pub name: String,
    /// Everything between the target and the closing `?>`.
    pub body: String,
}

/// A prefix→URI namespace binding, delivered when a scope opens or closes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespaceBinding {
    /// The bound prefix (empty for the default namespace).
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

/// A SAX event handler.
///
/// Implement the callbacks you care about; all methods have default no-op
/// implementations so you only need to override what you need. Handlers are
/// invoked synchronously during `write`/`end`/`flush`, in source order,
/// with the attribute-deferral exception documented on
/// [`SaxParser`](crate::SaxParser) for namespace mode.
#[allow(unused_variables)]
pub trait SaxHandler {
    /// Called when the parser is constructed or reset.
    fn on_ready(&mut self) {}

    /// Called with a contiguous run of character data. Exactly one text
    /// event is delivered per contiguous region, immediately before the
    /// next non-text event, unless `flush` or buffer partitioning split it.
    fn on_text(&mut self, text: &str) {}

    /// Called when a tag name has been committed, before any of its
    /// attributes are parsed. `tag.attributes` is still empty.
    fn on_open_tag_start(&mut self, tag: &Tag) {}

    /// Called for each attribute. With namespaces enabled this fires after
    /// the element's [`on_open_namespace`](SaxHandler::on_open_namespace)
    /// events, immediately before
    /// [`on_open_tag`](SaxHandler::on_open_tag); otherwise it fires as soon
    /// as the attribute value closes.
    fn on_attribute(&mut self, attribute: &Attribute) {}

    /// Called when an open tag is complete (after `>` or `/>`).
    fn on_open_tag(&mut self, tag: &Tag) {}

    /// Called when an element closes. Self-closing tags produce this
    /// immediately after their open event.
    fn on_close_tag(&mut self, name: &str) {}

    /// Called when a `<![CDATA[` section opens.
    fn on_open_cdata(&mut self) {}

    /// Called with CDATA content. Large sections may be split by the buffer
    /// partitioning policy.
    fn on_cdata(&mut self, text: &str) {}

    /// Called when a CDATA section closes.
    fn on_close_cdata(&mut self) {}

    /// Called with comment content (whitespace handling applied).
    fn on_comment(&mut self, text: &str) {}

    /// Called with the doctype body (everything after `<!DOCTYPE`).
    fn on_doctype(&mut self, text: &str) {}

    /// Called for a processing instruction.
    fn on_processing_instruction(&mut self, pi: &ProcessingInstruction) {}

    /// Called with the body of an SGML declaration that is neither a
    /// comment, CDATA section, nor doctype.
    fn on_sgml_declaration(&mut self, text: &str) {}

    /// Called when an element introduces a namespace binding, before the
    /// attribute events of that element.
    fn on_open_namespace(&mut self, binding: &NamespaceBinding) {}

    /// Called when the element that introduced a binding has closed.
    fn on_close_namespace(&mut self, binding: &NamespaceBinding) {}

    /// Called for every soft error. Parsing continues afterwards; in
    /// strict mode the error is also latched and raises on the next write.
    fn on_error(&mut self, error: &ParseError) {}

    /// Called once by `end` after the final text flush.
    fn on_end(&mut self) {}
}

/// A default no-op SAX handler. Useful as a base or for testing.
pub struct DefaultHandler;

impl SaxHandler for DefaultHandler {}
